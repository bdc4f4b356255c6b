mod courses;
pub use courses::{CommentsResponse, CourseDetails, CoursesResponse, TeacherShort};

mod results;
pub use results::{PerformanceResponse, ResultsResponse, SummaryResponse};

use serde::Serialize;

/// Plain acknowledgement.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}
