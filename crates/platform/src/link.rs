//! Link and PLL status used as preconditions of a forced calibration

/// Ethernet endpoint link status.
pub trait LinkMonitor {
    /// `true` when the endpoint reports link up.
    fn link_up(&mut self) -> bool;
}

/// Control of the main PLL in slave mode.
pub trait SlavePll {
    /// (Re)start the PLL locking to the recovered RX clock.
    fn start_slave(&mut self);

    /// `true` once the PLL reports lock.
    fn is_locked(&mut self) -> bool;
}
