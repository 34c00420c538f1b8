pub mod code;

pub use code::{CheckComplexityTool, DetectIssuesTool, ExtractFunctionsTool, SuggestImprovementsTool};
