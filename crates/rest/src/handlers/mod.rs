//! HTTP request handlers.
//!
//! - [`read`] - Read the current version of a resource
//! - [`vread`] - Read a specific version of a resource
//! - [`create`] - Create a resource with a server-assigned id
//! - [`update`] - Update, upsert or revive a resource
//! - [`delete`] - Delete a resource
//! - [`history`] - List every version of a resource
//! - [`health`] - Health check endpoint

pub mod create;
pub mod delete;
pub mod health;
pub mod history;
pub mod read;
pub mod update;
pub mod vread;

// Re-export handlers for convenience
pub use create::create_handler;
pub use delete::delete_handler;
pub use health::health_handler;
pub use history::history_instance_handler;
pub use read::read_handler;
pub use update::update_handler;
pub use vread::vread_handler;

use axum::http::StatusCode;
use quill_persistence::lifecycle::ResponseClass;

/// Maps a lifecycle response class to its HTTP status.
pub fn status_for(class: ResponseClass) -> StatusCode {
    match class {
        ResponseClass::Created => StatusCode::CREATED,
        ResponseClass::Ok => StatusCode::OK,
        ResponseClass::NoContent => StatusCode::NO_CONTENT,
        ResponseClass::NotFound => StatusCode::NOT_FOUND,
        ResponseClass::Gone => StatusCode::GONE,
        ResponseClass::NotModified => StatusCode::NOT_MODIFIED,
        ResponseClass::Conflict => StatusCode::CONFLICT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for() {
        assert_eq!(status_for(ResponseClass::Created), StatusCode::CREATED);
        assert_eq!(status_for(ResponseClass::NoContent), StatusCode::NO_CONTENT);
        assert_eq!(status_for(ResponseClass::Gone), StatusCode::GONE);
        assert_eq!(
            status_for(ResponseClass::NotModified),
            StatusCode::NOT_MODIFIED
        );
    }
}
