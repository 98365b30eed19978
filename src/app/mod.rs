pub mod ports;
pub mod extract_use_case;
pub mod merge_use_case;
pub mod image_use_case;
pub mod upload_use_case;
