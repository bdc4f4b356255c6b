use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    DatabaseResult,
    entity::{CourseComment, CourseDetailsRow, CourseResource, UserBrief},
};

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherShort {
    pub id: Uuid,
    pub name: Option<String>,
}

/// Course with its teacher, enrolled students and uploaded resources.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetails {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub teacher: TeacherShort,
    pub students: Vec<UserBrief>,
    pub resources: Vec<CourseResource>,
}

impl TryFrom<CourseDetailsRow> for CourseDetails {
    type Error = serde_json::Error;

    fn try_from(value: CourseDetailsRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            title: value.title,
            description: value.description,
            teacher: TeacherShort {
                id: value.teacher_id,
                name: value.teacher_name,
            },
            students: serde_json::from_value(value.students)?,
            resources: serde_json::from_value(value.resources)?,
        })
    }
}

impl CourseDetails {
    pub fn from_rows(rows: Vec<CourseDetailsRow>) -> DatabaseResult<Vec<Self>> {
        Ok(rows
            .into_iter()
            .map(CourseDetails::try_from)
            .collect::<Result<_, _>>()?)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CoursesResponse {
    pub courses: Vec<CourseDetails>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentsResponse {
    pub comments: Vec<CourseComment>,
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn aggregated_columns_decode() {
        let student = Uuid::new_v4();
        let row = CourseDetailsRow {
            id: Uuid::new_v4(),
            title: String::from("Physics"),
            description: String::new(),
            teacher_id: Uuid::new_v4(),
            teacher_name: Some(String::from("Dr. Who")),
            students: json!([{
                "id": student,
                "name": "Ann",
                "email": "ann@example.com",
                "registrationNumber": "123456"
            }]),
            resources: json!([{
                "id": Uuid::new_v4(),
                "courseId": Uuid::new_v4(),
                "filename": "notes.pdf",
                "url": "/uploads/notes.pdf",
                "uploadedAt": "2025-03-01T10:00:00.123456+00:00"
            }]),
        };

        let details = CourseDetails::try_from(row).unwrap();
        assert_eq!(details.students[0].id, student);
        assert_eq!(details.students[0].registration_number, "123456");
        assert_eq!(details.resources[0].filename(), "notes.pdf");
        assert_eq!(details.teacher.name.as_deref(), Some("Dr. Who"));
    }

    #[test]
    fn empty_aggregates_decode_to_empty_lists() {
        let row = CourseDetailsRow {
            id: Uuid::new_v4(),
            title: String::from("Empty"),
            description: String::new(),
            teacher_id: Uuid::new_v4(),
            teacher_name: None,
            students: json!([]),
            resources: json!([]),
        };

        let details = CourseDetails::try_from(row).unwrap();
        assert!(details.students.is_empty());
        assert!(details.resources.is_empty());
    }
}
