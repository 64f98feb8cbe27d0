//! 掷骰工具：D&D 记法（NdM，可选 kK 保留最高 K 个）
//!
//! 参数：{"notation": "2d20k1", "num_rolls": 3}；输出每次掷骰的点数、保留值与合计。

use std::fmt::Write as _;

use async_trait::async_trait;
use rand::Rng;

use crate::config::DiceSection;
use crate::tools::registry::required_str;
use crate::tools::{Tool, ToolError, ROLL_DICE};
use crate::workflow::StepParams;

/// 解析后的骰子记法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceSpec {
    pub count: u32,
    pub sides: u32,
    pub keep: Option<u32>,
}

impl DiceSpec {
    /// 解析 `NdM` / `NdMkK`（大小写不敏感）
    pub fn parse(notation: &str) -> Result<Self, ToolError> {
        let invalid = || ToolError::Failed(format!("Invalid dice notation: {notation}"));
        let lowered = notation.trim().to_lowercase();
        let (count, rest) = lowered.split_once('d').ok_or_else(invalid)?;
        let (sides, keep) = match rest.split_once('k') {
            Some((sides, keep)) => (sides, Some(keep.parse::<u32>().map_err(|_| invalid())?)),
            None => (rest, None),
        };
        let count = count.parse::<u32>().map_err(|_| invalid())?;
        let sides = sides.parse::<u32>().map_err(|_| invalid())?;

        if count == 0 || sides < 2 {
            return Err(invalid());
        }
        if let Some(k) = keep {
            if k == 0 || k > count {
                return Err(ToolError::Failed(format!(
                    "Invalid dice notation: {notation} (keep must be between 1 and {count})"
                )));
            }
        }
        Ok(Self { count, sides, keep })
    }
}

/// 一次掷骰结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roll {
    pub dice: Vec<u32>,
    pub kept: Vec<u32>,
    pub total: u32,
}

/// 用给定随机源掷一次
pub fn roll_once<R: Rng + ?Sized>(spec: &DiceSpec, rng: &mut R) -> Roll {
    let dice: Vec<u32> = (0..spec.count).map(|_| rng.gen_range(1..=spec.sides)).collect();
    let kept = match spec.keep {
        Some(k) => {
            let mut sorted = dice.clone();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            sorted.truncate(k as usize);
            sorted
        }
        None => dice.clone(),
    };
    let total = kept.iter().sum();
    Roll { dice, kept, total }
}

fn render(notation: &str, spec: &DiceSpec, rolls: &[Roll]) -> String {
    let mut out = format!("🎲 {notation} x{}\n", rolls.len());
    for (i, roll) in rolls.iter().enumerate() {
        let _ = write!(out, "Roll {}: {:?}", i + 1, roll.dice);
        if spec.keep.is_some() {
            let _ = write!(out, " keep {:?}", roll.kept);
        }
        let _ = writeln!(out, " = {}", roll.total);
    }
    if rolls.len() > 1 {
        let grand: u32 = rolls.iter().map(|r| r.total).sum();
        let _ = write!(out, "Grand total: {grand}");
    }
    out.trim_end().to_string()
}

/// 掷骰工具：上限来自 [tools.dice] 配置
pub struct DiceTool {
    limits: DiceSection,
}

impl DiceTool {
    pub fn new(limits: DiceSection) -> Self {
        Self { limits }
    }

    fn check_limits(&self, spec: &DiceSpec, num_rolls: u32) -> Result<(), ToolError> {
        if spec.count > self.limits.max_dice {
            return Err(ToolError::Failed(format!(
                "Too many dice: {} (max {})",
                spec.count, self.limits.max_dice
            )));
        }
        if spec.sides > self.limits.max_sides {
            return Err(ToolError::Failed(format!(
                "Too many sides: {} (max {})",
                spec.sides, self.limits.max_sides
            )));
        }
        if num_rolls == 0 || num_rolls > self.limits.max_rolls {
            return Err(ToolError::Failed(format!(
                "num_rolls must be between 1 and {}, got {num_rolls}",
                self.limits.max_rolls
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Tool for DiceTool {
    fn name(&self) -> &str {
        ROLL_DICE
    }

    fn description(&self) -> &str {
        "Roll dice with D&D notation. Args: {\"notation\": \"2d20k1\", \"num_rolls\": 1}"
    }

    async fn execute(&self, args: &StepParams) -> Result<String, ToolError> {
        let notation = required_str(args, "notation")?;
        let num_rolls = match args.get("num_rolls") {
            None => 1,
            Some(raw) => raw
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| ToolError::Failed(format!("Invalid num_rolls: {raw}")))?,
        };
        let spec = DiceSpec::parse(notation)?;
        self.check_limits(&spec, num_rolls)?;

        let mut rng = rand::thread_rng();
        let rolls: Vec<Roll> = (0..num_rolls).map(|_| roll_once(&spec, &mut rng)).collect();
        Ok(render(notation, &spec, &rolls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_notation() {
        assert_eq!(
            DiceSpec::parse("2d20").unwrap(),
            DiceSpec { count: 2, sides: 20, keep: None }
        );
        assert_eq!(
            DiceSpec::parse("3D6K2").unwrap(),
            DiceSpec { count: 3, sides: 6, keep: Some(2) }
        );
        assert!(DiceSpec::parse("d6").is_err());
        assert!(DiceSpec::parse("2d1").is_err());
        assert!(DiceSpec::parse("2d6k3").is_err());
        assert!(DiceSpec::parse("banana").is_err());
    }

    #[test]
    fn test_roll_keeps_highest() {
        let spec = DiceSpec { count: 4, sides: 6, keep: Some(3) };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let roll = roll_once(&spec, &mut rng);
            assert_eq!(roll.dice.len(), 4);
            assert_eq!(roll.kept.len(), 3);
            assert!(roll.dice.iter().all(|d| (1..=6).contains(d)));
            let min = *roll.dice.iter().min().unwrap();
            assert_eq!(roll.total, roll.dice.iter().sum::<u32>() - min);
        }
    }

    #[tokio::test]
    async fn test_execute_multiple_rolls() {
        let tool = DiceTool::new(DiceSection::default());
        let mut args = StepParams::new();
        args.insert("notation".into(), "1d6".into());
        args.insert("num_rolls".into(), 5.into());
        let out = tool.execute(&args).await.unwrap();
        assert!(out.contains("Roll 5:"));
        assert!(out.contains("Grand total"));
    }

    #[tokio::test]
    async fn test_execute_respects_limits() {
        let tool = DiceTool::new(DiceSection::default());
        let mut args = StepParams::new();
        args.insert("notation".into(), "1000d6".into());
        assert!(tool.execute(&args).await.is_err());

        args.insert("notation".into(), "1d6".into());
        args.insert("num_rolls".into(), 0.into());
        assert!(tool.execute(&args).await.is_err());
    }

    #[tokio::test]
    async fn test_num_rolls_overflow_is_rejected() {
        let tool = DiceTool::new(DiceSection::default());
        let mut args = StepParams::new();
        args.insert("notation".into(), "1d6".into());
        args.insert("num_rolls".into(), 4_294_967_297u64.into());
        let err = tool.execute(&args).await.unwrap_err();
        assert!(matches!(err, ToolError::Failed(msg) if msg.contains("num_rolls")));

        args.insert("num_rolls".into(), (-3).into());
        assert!(tool.execute(&args).await.is_err());
    }
}
