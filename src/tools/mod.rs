//! 工具箱：注册表、执行器、双通道结果与各能力工具

pub mod echo;
pub mod excel;
pub mod executor;
pub mod mail;
pub mod output;
pub mod pdf;
pub mod registry;
pub mod word;

pub use echo::EchoTool;
pub use excel::BuildExcelTool;
pub use executor::ToolExecutor;
pub use mail::SendMailTool;
pub use output::{ToolOutput, ARTIFACT_DELIMITER};
pub use pdf::BuildPdfTool;
pub use registry::{Tool, ToolRegistry};
pub use word::BuildWordTool;
