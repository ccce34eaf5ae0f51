pub mod booking;
pub mod notification;
pub mod service;

pub use booking::{Booking, BookingStatus};
pub use notification::{Notification, NotificationKind};
pub use service::ServiceInfo;
