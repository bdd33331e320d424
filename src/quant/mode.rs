use anyhow::Result;
use std::fmt;
use std::str::FromStr;

/// 量子化モード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantMode {
    Int8,
    Float16,
    Float32,
}

impl QuantMode {
    /// 書き出し・評価の順
    pub const ALL: [QuantMode; 3] = [QuantMode::Int8, QuantMode::Float16, QuantMode::Float32];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuantMode::Int8 => "int8",
            QuantMode::Float16 => "float16",
            QuantMode::Float32 => "float32",
        }
    }

    /// 成果物の拡張子（int8 は独自形式、浮動小数点は burn の記録）
    pub fn extension(&self) -> &'static str {
        match self {
            QuantMode::Int8 => "qmodel",
            QuantMode::Float16 | QuantMode::Float32 => "mpk",
        }
    }
}

impl fmt::Display for QuantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        QuantMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown quantization mode: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names() {
        let names: Vec<&str> = QuantMode::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, vec!["int8", "float16", "float32"]);
        assert_eq!("float16".parse::<QuantMode>().unwrap(), QuantMode::Float16);
        assert!("uint4".parse::<QuantMode>().is_err());
    }

    #[test]
    fn test_extensions() {
        assert_eq!(QuantMode::Int8.extension(), "qmodel");
        assert_eq!(QuantMode::Float16.extension(), "mpk");
        assert_eq!(QuantMode::Float32.extension(), "mpk");
    }
}
