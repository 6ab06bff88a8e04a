pub mod channel_manager;
pub mod role_manager;
pub mod verification_manager;

pub use channel_manager::{create_shared_channel_manager, SharedChannelManager};
pub use role_manager::{create_shared_role_manager, SharedRoleManager};
pub use verification_manager::{
    create_shared_verification_manager, SharedVerificationManager,
    VerificationSettings,
};
