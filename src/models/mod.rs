pub mod course;
pub mod department;
pub mod faculty;
pub mod faculty_course;
pub mod office;
pub mod publication;
pub mod scrape_log;

pub use course::{Course, CourseListing, CoursePatch, NewCourse};
pub use department::{Department, DepartmentPatch, DepartmentSummary, NewDepartment};
pub use faculty::{
    Faculty, FacultyListing, FacultyName, FacultyPatch, FacultyProfile, FacultyWithCourses,
    NewFaculty,
};
pub use faculty_course::{CourseAssignment, FacultyCourse, NewFacultyCourse};
pub use office::{NewOffice, Office};
pub use publication::{NewPublication, Publication, PublicationListing, PublicationPatch};
pub use scrape_log::{NewScrapeLog, ScrapeLog, ScrapeStatus};
