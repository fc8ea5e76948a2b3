pub mod booking;
pub mod calendar;
pub mod deliverable;
pub mod notification;
pub mod wall_clock;
