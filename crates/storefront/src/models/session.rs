//! Keys for values kept in the visitor's HTTP session.

/// Session keys.
pub mod keys {
    /// Key for the visitor ID that selects the visitor's store.
    pub const VISITOR_ID: &str = "visitor_id";

    /// Key for the persisted part of the store (the cart).
    pub const PERSISTED_STATE: &str = "persist:root";
}
