//! Ext.Direct request dispatch.
//!
//! The router endpoint accepts a single call object or a batch array, looks
//! each call up in the registry, invokes its handler and answers with the
//! matching envelope.
//!
//! ## Protocol
//!
//! ```json
//! {"action":"myclass","method":"myview","data":[1,2,3,4],"type":"rpc","tid":1}
//! ```
//!
//! Successful calls are answered with an `rpc` envelope:
//!
//! ```json
//! {"type":"rpc","tid":1,"action":"myclass","method":"myview","result":13.37}
//! ```
//!
//! Failures never abort the request; they are answered with an `exception`
//! envelope carrying `kind`, `message` and `where`.

mod errors;
mod form;
mod request;
mod response;
mod router;

pub use self::errors::{DispatchError, ErrorKind};
pub use self::form::FormRequest;
pub use self::request::{RouterPayload, RpcRequest};
pub use self::response::{RouterResponse, RpcResponse};
pub use self::router::{DispatchOptions, Dispatcher};
pub(crate) use self::router::DISPATCH_TARGET;
