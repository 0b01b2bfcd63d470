//! Rolodex contacts server - integration test support.
//!
//! This crate re-exports the workspace crates so the integration tests can
//! reach every layer through `rolodex_test::` paths.

pub mod component {
    pub use rolodex_core::{constants, error as core_error};
    pub use rolodex_service::{account, auth, contact, mail, tag};

    pub mod db {
        pub use rolodex_db::db::*;

        pub mod connection {
            pub use rolodex_app::db_handler::DbProviderHandler;
            pub use rolodex_db::db::connection::*;
        }
    }

    pub mod model {
        pub use rolodex_db::model::*;
    }

    pub mod config {
        pub use rolodex_app::config::ConfigHandler;
        pub use rolodex_core::config::*;
    }
}

pub mod app {
    pub use rolodex_app::*;

    pub mod api {
        pub use rolodex_app::app::api::*;
    }
}
