pub mod assignment_files;
pub mod correction_status;
pub mod storage;
