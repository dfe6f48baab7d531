pub use self::kind::{CONFIG_MAPS, SECRETS, WatchedKind};
pub use self::payload::{PayloadError, ResourcePayload};
pub use self::resource_ref::ResourceRef;

mod kind;
mod payload;
mod resource_ref;
