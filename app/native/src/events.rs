//! Centralized channel definitions for cross-window communication.
//!
//! Every message exchanged between the hub, note windows, and the overlay
//! travels on one of the named channels below. Keeping them in one place
//! makes it easy to keep the window processes and the hub in sync.
//!
//! ## Naming Convention
//!
//! - `note:<event>` - Traffic between a note window and the hub
//! - `persist:<status>` - Outcome of a layout save, consumed by the hub UI
//! - `<kebab-case>` - Capability calls and overlay sync

/// Channels emitted by note windows and consumed by the hub.
pub mod note {
    /// The window's outer position changed.
    ///
    /// Payload: `{ id, rect }`
    pub const MOVED: &str = "note:moved";

    /// The window's outer size changed.
    ///
    /// Payload: `{ id, rect }`
    pub const RESIZED: &str = "note:resized";

    /// The window gained OS focus.
    ///
    /// Payload: `{ id }`
    pub const FOCUSED: &str = "note:focused";

    /// The window lost OS focus.
    ///
    /// Payload: `{ id }`
    pub const BLURRED: &str = "note:blurred";

    /// The window was closed by the OS or the user.
    ///
    /// Payload: `{ id }`
    pub const CLOSED: &str = "note:closed";

    /// Title or content edited in the window.
    ///
    /// Payload: `{ id, title?, content? }`
    pub const CONTENT_CHANGED: &str = "note:content_changed";

    /// The window finished initializing and can receive hydration.
    ///
    /// Payload: `{ id }`
    pub const READY: &str = "note:ready";

    /// Fallback pull for hydration when `ready` was missed.
    ///
    /// Payload: `{ id }`
    pub const REQUEST_HYDRATE: &str = "note:request_hydrate";

    /// Sent by the hub: the data a freshly spawned window should display.
    ///
    /// Payload: `{ id, title, content, color? }`
    pub const HYDRATE: &str = "note:hydrate";
}

/// Persistence outcome channels.
pub mod persist {
    /// A save completed.
    ///
    /// Payload: `{}`
    pub const OK: &str = "persist:ok";

    /// A save failed.
    ///
    /// Payload: `{ error? }`
    pub const FAIL: &str = "persist:fail";
}

/// Overlay channels.
pub mod overlay {
    /// Full overlay payload, re-sent after every board revision.
    ///
    /// Payload: `{ notes, links, showConnections, connectStyle }`
    pub const STATE_SYNC: &str = "overlay-state-sync";
}

/// Capability calls issued by the hub to the window host.
pub mod capability {
    pub const SPAWN_WINDOW: &str = "spawn-window";
    pub const FOCUS_WINDOW: &str = "focus-window";
    pub const CLOSE_WINDOW: &str = "close-window";
    pub const SET_WINDOW_RECT: &str = "set-window-rect";
    pub const PERSIST_LAYOUT: &str = "persist-layout";
    pub const LOAD_LAYOUT: &str = "load-layout";
    pub const ENUMERATE_WINDOWS: &str = "enumerate-windows";
    pub const MOVE_EXTERNAL_WINDOW: &str = "move-external-window";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_channels_share_prefix() {
        for channel in [
            note::MOVED,
            note::RESIZED,
            note::FOCUSED,
            note::BLURRED,
            note::CLOSED,
            note::CONTENT_CHANGED,
            note::READY,
            note::REQUEST_HYDRATE,
            note::HYDRATE,
        ] {
            assert!(channel.starts_with("note:"), "{channel} is missing the note: prefix");
        }
    }

    #[test]
    fn test_persist_channels() {
        assert_eq!(persist::OK, "persist:ok");
        assert_eq!(persist::FAIL, "persist:fail");
    }
}
