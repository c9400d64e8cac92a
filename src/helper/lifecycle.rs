//! # Window Lifecycle Module
//!
//! Tracks the single application window. The shell creates it on startup, forgets it
//! when it closes, recreates it when the app is reactivated, and decides whether the
//! process should exit once no window is left.

/// Desktop conventions that change what happens after the last window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Apps stay resident until the user quits explicitly.
    MacOs,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }
}

/// What the process does once its last window has closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterLastWindow {
    Quit,
    StayResident,
}

#[derive(Debug)]
pub struct WindowLifecycle {
    platform: Platform,
    window_open: bool,
    windows_created: u32,
}

impl WindowLifecycle {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            window_open: false,
            windows_created: 0,
        }
    }

    pub fn is_window_open(&self) -> bool {
        self.window_open
    }

    pub fn windows_created(&self) -> u32 {
        self.windows_created
    }

    /// Startup. Returns `true` when a window must be created.
    pub fn on_ready(&mut self) -> bool {
        self.open_if_closed()
    }

    /// The window was closed; drop our reference to it.
    pub fn on_closed(&mut self) {
        self.window_open = false;
    }

    /// The app was reactivated. Returns `true` when a window must be recreated.
    pub fn on_activate(&mut self) -> bool {
        self.open_if_closed()
    }

    pub fn on_all_windows_closed(&self) -> AfterLastWindow {
        match self.platform {
            Platform::MacOs => AfterLastWindow::StayResident,
            Platform::Other => AfterLastWindow::Quit,
        }
    }

    fn open_if_closed(&mut self) -> bool {
        if self.window_open {
            return false;
        }
        self.window_open = true;
        self.windows_created += 1;
        true
    }
}
