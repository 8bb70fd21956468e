pub mod exam_service;
pub mod grading_service;
pub mod job_service;
pub mod message_gateway;
pub mod notification_service;
pub mod pipeline_service;
pub mod reasoning_client;
pub mod recruiter_service;
pub mod scoring_service;
