pub(crate) mod access_codes;
pub(crate) mod accounts;
pub(crate) mod archive;
pub(crate) mod authoring;
pub(crate) mod exam_session;
pub(crate) mod manifest;
pub(crate) mod question_import;
pub(crate) mod storage;
pub(crate) mod student_provisioning;
pub(crate) mod tabular;
