pub mod class;
pub mod fee_payment;
pub mod fee_structure;
pub mod pickup_location;
pub mod role;
pub mod score_grade;
pub mod student;
pub mod subject;
pub mod teacher;
pub mod test;
