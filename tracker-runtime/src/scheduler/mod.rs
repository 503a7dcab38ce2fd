mod action;
mod builder;
mod clock;
mod handle;
mod scheduler;

pub use action::{Action, ActionFuture};
pub use builder::SchedulerBuilder;
pub use clock::{Clock, SystemClock};
pub use handle::SchedulerHandle;
pub use scheduler::{Scheduler, SchedulerState};
