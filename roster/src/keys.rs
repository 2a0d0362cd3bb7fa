/// Build the key for a student record.
/// Format: `stu:{course}:{id_10d}`
///
/// The id is zero-padded so a prefix scan returns a course's students in
/// ascending id order.
pub fn student_key(course_id: &str, student_id: u32) -> String {
    format!("stu:{course_id}:{student_id:010}")
}

/// Return the key prefix for listing one course's students.
/// Format: `stu:{course}:`
pub fn course_prefix(course_id: &str) -> String {
    format!("stu:{course_id}:")
}

/// Key prefix shared by every student record.
pub const STUDENT_PREFIX: &str = "stu:";
