use bitflags::bitflags;

bitflags! {
    /// What a [`ControlBackend`](crate::backend::ControlBackend) can do.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BackendCapabilities: u32 {
        /// Single-point press and release.
        const TOUCH         = 1 << 0;
        /// Timed drag between two points.
        const SWIPE         = 1 << 1;
        /// Repeated taps issued by the device itself.
        const FAST_TOUCH    = 1 << 2;
        /// Screen capture.
        const CAPTURE       = 1 << 3;
        /// Commands can target more than one display.
        const MULTI_DISPLAY = 1 << 4;
        /// Input is injected without a per-command round trip.
        const LOW_LATENCY   = 1 << 5;
    }
}

impl BackendCapabilities {
    /// Input-only backends: touch, swipe and fast touch.
    pub const INPUT: Self = Self::TOUCH.union(Self::SWIPE).union(Self::FAST_TOUCH);
}
