/// External builder and signer capabilities
pub mod builder;
/// Lifecycle event stream
pub mod events;
/// Shared single-writer transaction record
pub mod handle;
/// Build, broadcast and hand-over to monitoring
pub mod lifecycle;
/// Background confirmation polling
pub mod monitor;

pub use builder::{
	BuildContext, BuildError, SignedTransaction, Signer, TransactionBuilder, TransactionRequest,
};
pub use events::{TransactionEvent, TransactionEvents};
pub use handle::{LifecycleState, TransactionHandle};
pub use lifecycle::{
	BroadcastError, PendingTransaction, SendError, TransactionLifecycle, TransactionOutcome,
	Transfer,
};
pub use monitor::{ConfirmationMonitor, MonitorExit};

/// Fee applied when a send does not specify one, in smallest units.
pub const DEFAULT_FEE_UNITS: u64 = 10_000;

/// Broadcast attempts before a send is rejected.
pub const DEFAULT_BROADCAST_ATTEMPTS: u32 = 3;
