//! 查询与索引构建参数。

pub mod mass;
pub mod matching;
pub mod modification;
pub mod settings;
pub mod variants;

pub use mass::{MassTolerance, MassUnit};
pub use matching::{MatchingType, SequenceMatching};
pub use modification::{Modification, ModificationCategory, ModificationSettings, ModificationTables};
pub use settings::SearchSettings;
pub use variants::{SubstitutionMatrix, VariantBudget, VariantSettings};
