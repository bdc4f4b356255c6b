mod user;
pub use user::{UserBrief, UserEntity, UserEntityCreateUpdate};

mod course;
pub use course::{Course, CourseCreate, CourseDetailsRow};

mod course_resource;
pub use course_resource::{CourseResource, CourseResourceCreate};

mod comment;
pub use comment::CourseComment;

mod timetable;
pub use timetable::{ScheduleSlot, Timetable, TimetableView};

pub use test::{Test, TestCreate};

mod submission;
pub use submission::{Submission, SubmissionCreateUpdate, SubmissionRecord};

mod message;
pub use message::{InboxMessage, Message};
