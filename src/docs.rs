use crate::api::class::{ClassDetail, ClassListResponse, CreateClass, UpdateClass};
use crate::api::dashboard::{
    DashboardSummary, EnrollmentPoint, Notifications, QuickLink, RecentAdmission,
    SubjectPopularity,
};
use crate::api::fee_payment::{
    CreateFeePayment, FeePaymentListResponse, PaymentDeleted, UpdateFeePayment,
};
use crate::api::fee_structure::{
    CreateFeeStructure, FeeStructureListResponse, UpdateFeeStructure,
};
use crate::api::pickup_location::{
    CreatePickupLocation, PickupLocationListResponse, UpdatePickupLocation,
};
use crate::api::score_grade::{CreateScoreGrade, ScoreGradeListResponse, UpdateScoreGrade};
use crate::api::student::{CreateStudent, StudentDetail, StudentListResponse, UpdateStudent};
use crate::api::subject::{SubjectDetail, SubjectListResponse, SubjectPayload};
use crate::api::teacher::{CreateTeacher, TeacherDetail, TeacherListResponse, UpdateTeacher};
use crate::api::test::{CreateTest, TestListResponse, UpdateTest};
use crate::auth::handlers::{LoginResponse, ProtectedResponse, TokenPair};
use crate::engine::fees::{FeeComponents, FeeComponentsInput, FeeStatement};
use crate::engine::grading::{LetterGrade, StudentReport, SubjectResult};
use crate::model::{
    class::{Class, ClassSummary},
    fee_payment::FeePayment,
    fee_structure::FeeStructure,
    pickup_location::PickupLocation,
    score_grade::ScoreGrade,
    student::{Student, StudentListItem, StudentSummary},
    subject::Subject,
    teacher::{Teacher, TeacherSummary},
    test::Test,
};
use crate::models::{LoginReqDto, MessageResponse, RegisterReq};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Administration API",
        version = "1.0.0",
        description = r#"
## School Administration System

Backend for running a school office: pupils, staff, classes, marks and fees.

### Key Features
- **Students, Teachers, Classes, Subjects**
  - Create, update, list and view records; deleting a class removes its students
- **Scores & Reports**
  - Record scores per subject, test, term and year
  - Letter grades from A down to E, term reports with averages
- **Fees**
  - Per-class fee structures, transport surcharges by pickup location
  - Payments with the outstanding balance frozen at the time of each payment
- **Dashboard**
  - Counts, recent admissions, enrollment and subject charts

### Security
Everything under `/api` needs an access token: `Authorization: Bearer <token>`.
Obtain one from `/auth/login`. Deleting students, teachers, classes and subjects
is reserved for **admin** users.

### Response Format
- JSON bodies; errors are `{"message": "..."}`
- List endpoints take `page` and `per_page` and return `{data, page, per_page, total, pages}`
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::protected,

        crate::api::student::create_student,
        crate::api::student::list_students,
        crate::api::student::get_student,
        crate::api::student::update_student,
        crate::api::student::delete_student,
        crate::api::student::student_balance,

        crate::api::teacher::create_teacher,
        crate::api::teacher::list_teachers,
        crate::api::teacher::get_teacher,
        crate::api::teacher::update_teacher,
        crate::api::teacher::delete_teacher,

        crate::api::class::create_class,
        crate::api::class::list_classes,
        crate::api::class::get_class,
        crate::api::class::update_class,
        crate::api::class::delete_class,

        crate::api::subject::create_subject,
        crate::api::subject::list_subjects,
        crate::api::subject::get_subject,
        crate::api::subject::update_subject,
        crate::api::subject::delete_subject,

        crate::api::test::create_test,
        crate::api::test::list_tests,
        crate::api::test::get_test,
        crate::api::test::update_test,
        crate::api::test::delete_test,

        crate::api::score_grade::create_score_grade,
        crate::api::score_grade::list_score_grades,
        crate::api::score_grade::get_score_grade,
        crate::api::score_grade::update_score_grade,
        crate::api::score_grade::delete_score_grade,

        crate::api::report::student_report,

        crate::api::fee_structure::create_fee_structure,
        crate::api::fee_structure::list_fee_structures,
        crate::api::fee_structure::get_fee_structure,
        crate::api::fee_structure::update_fee_structure,
        crate::api::fee_structure::delete_fee_structure,

        crate::api::pickup_location::create_pickup_location,
        crate::api::pickup_location::list_pickup_locations,
        crate::api::pickup_location::get_pickup_location,
        crate::api::pickup_location::update_pickup_location,
        crate::api::pickup_location::delete_pickup_location,

        crate::api::fee_payment::create_fee_payment,
        crate::api::fee_payment::list_fee_payments,
        crate::api::fee_payment::get_fee_payment,
        crate::api::fee_payment::update_fee_payment,
        crate::api::fee_payment::delete_fee_payment,

        crate::api::dashboard::summary,
        crate::api::dashboard::notifications,
        crate::api::dashboard::enrollment_chart,
        crate::api::dashboard::subject_popularity,
        crate::api::dashboard::quick_links
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            LoginResponse,
            ProtectedResponse,
            TokenPair,
            MessageResponse,
            Student,
            StudentListItem,
            StudentSummary,
            StudentDetail,
            StudentListResponse,
            CreateStudent,
            UpdateStudent,
            FeeStatement,
            Teacher,
            TeacherSummary,
            TeacherDetail,
            TeacherListResponse,
            CreateTeacher,
            UpdateTeacher,
            Class,
            ClassSummary,
            ClassDetail,
            ClassListResponse,
            CreateClass,
            UpdateClass,
            Subject,
            SubjectDetail,
            SubjectListResponse,
            SubjectPayload,
            Test,
            TestListResponse,
            CreateTest,
            UpdateTest,
            ScoreGrade,
            ScoreGradeListResponse,
            CreateScoreGrade,
            UpdateScoreGrade,
            LetterGrade,
            StudentReport,
            SubjectResult,
            FeeComponents,
            FeeComponentsInput,
            FeeStructure,
            FeeStructureListResponse,
            CreateFeeStructure,
            UpdateFeeStructure,
            PickupLocation,
            PickupLocationListResponse,
            CreatePickupLocation,
            UpdatePickupLocation,
            FeePayment,
            FeePaymentListResponse,
            CreateFeePayment,
            UpdateFeePayment,
            PaymentDeleted,
            DashboardSummary,
            RecentAdmission,
            Notifications,
            EnrollmentPoint,
            SubjectPopularity,
            QuickLink
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "Student", description = "Student records and fee balances"),
        (name = "Teacher", description = "Teacher records"),
        (name = "Class", description = "Classes and their students"),
        (name = "Subject", description = "Subjects"),
        (name = "Test", description = "Examination sittings"),
        (name = "ScoreGrade", description = "Recorded scores with letter grades"),
        (name = "Report", description = "Term reports"),
        (name = "FeeStructure", description = "Per-class fee schedules"),
        (name = "PickupLocation", description = "Transport pickup points and surcharges"),
        (name = "FeePayment", description = "Fee payments and balance snapshots"),
        (name = "Dashboard", description = "Overview figures"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
