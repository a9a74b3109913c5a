//! JSON admin API under `/__manage`.
//!
//! - `GET /__manage` - stored resources and RPC methods
//! - `GET|POST /__manage/create` - inspect or create a REST resource method
//! - `GET|POST /__manage/create/rpc` - inspect or create an RPC method
//! - `POST|DELETE /__manage/resource/{METHOD}-{path}` - upstream toggle, delete
//! - `POST|DELETE /__manage/rpc/{name}` - upstream toggle, delete
//! - `GET|POST /__manage/settings` - upstream URL and basic-auth gate
//! - `GET /__manage/logs` - request log of a day
//! - `GET /__manage/health`

mod handlers;
mod router;
mod types;

pub use router::{is_admin_path, route_request, ADMIN_PREFIX};
