//! Care DX Common Library
//!
//! マッピング解析・抽出値の正規化・転記指示の生成（I/Oなし）
//! 会議録の見出し合わせもここで行う

pub mod cell;
pub mod error;
pub mod export;
pub mod mapping;
pub mod meeting;
pub mod normalizer;
pub mod parser;
pub mod prompts;
pub mod transcription;
pub mod types;

pub use cell::CellRef;
pub use error::{Error, Result};
pub use mapping::MappingSet;
pub use meeting::{build_meeting_row, build_service_meeting_prompt, SERVICE_MEETING_KEYS};
pub use normalizer::{normalize, NormalizationResult, Warning, BLANK_MARKER};
pub use parser::{extract_json, parse_extraction_response, ExtractionPayload, RawFieldValue};
pub use prompts::{build_extraction_prompt, field_batches, DEFAULT_BATCH_SIZE};
pub use transcription::build_instructions;
pub use types::{ExtractedValue, FieldDefinition, WriteInstruction};
