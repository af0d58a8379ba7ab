//! # Vars 模块
//!
//! 脚本变量。
//!
//! - 数值变量 `$0`..`$10999`：`$0`..`$9999` 为局部变量（随存档保存），
//!   `$10000` 起为全局变量（跨存档共享）
//! - 名字变量 `%a`..`%z`：字符串
//! - 调用参数 `&1`..`&9`：由 gosub 设置，见 [`ScriptCursor`](crate::cursor::ScriptCursor)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cursor::ScriptCursor;
use crate::error::ScriptError;

/// 局部变量个数
pub const LOCAL_VAR_SIZE: usize = 10000;
/// 全局变量个数
pub const GLOBAL_VAR_SIZE: usize = 1000;
/// 变量总数
pub const VAR_SIZE: usize = LOCAL_VAR_SIZE + GLOBAL_VAR_SIZE;
/// 名字变量个数
pub const NAME_VAR_SIZE: usize = 26;

/// 变量表
///
/// 只保存非零数值变量和非空名字变量。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variables {
    numbers: BTreeMap<usize, i32>,
    names: BTreeMap<usize, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取数值变量（未设置时为 0）
    pub fn get(&self, index: usize) -> i32 {
        self.numbers.get(&index).copied().unwrap_or(0)
    }

    /// 设置数值变量
    pub fn set(&mut self, index: usize, value: i32) -> Result<(), ScriptError> {
        if index >= VAR_SIZE {
            return Err(ScriptError::VariableIndex { index: index as i64 });
        }
        if value == 0 {
            self.numbers.remove(&index);
        } else {
            self.numbers.insert(index, value);
        }
        Ok(())
    }

    /// 读取名字变量（`0` 对应 `%a`）
    pub fn name(&self, index: usize) -> &str {
        self.names.get(&index).map(String::as_str).unwrap_or("")
    }

    /// 设置名字变量
    pub fn set_name(&mut self, index: usize, value: impl Into<String>) -> Result<(), ScriptError> {
        if index >= NAME_VAR_SIZE {
            return Err(ScriptError::VariableIndex { index: index as i64 });
        }
        let value = value.into();
        if value.is_empty() {
            self.names.remove(&index);
        } else {
            self.names.insert(index, value);
        }
        Ok(())
    }

    /// 只保留全局变量（读档时局部变量由存档覆盖）
    pub fn globals(&self) -> BTreeMap<usize, i32> {
        self.numbers
            .range(LOCAL_VAR_SIZE..)
            .map(|(k, v)| (*k, *v))
            .collect()
    }

    /// 用存档中的变量替换局部变量与名字变量，保留当前全局变量
    pub fn restore_locals(&mut self, saved: &Variables) {
        let globals = self.globals();
        self.numbers = saved
            .numbers
            .range(..LOCAL_VAR_SIZE)
            .map(|(k, v)| (*k, *v))
            .collect();
        self.numbers.extend(globals);
        self.names = saved.names.clone();
    }

    /// 执行 `set` 命令
    pub fn apply_set(&mut self, lhs: &str, op: &str, rhs: &str) -> Result<(), ScriptError> {
        if let Some(index) = parse_name_ref(lhs)? {
            return match op {
                "=" => self.set_name(index, rhs),
                "+=" => {
                    let value = format!("{}{}", self.name(index), rhs);
                    self.set_name(index, value)
                }
                _ => Err(ScriptError::InvalidOperator { op: op.to_string() }),
            };
        }

        let index = parse_var_ref(lhs)?;
        let lval = self.get(index);
        let rval = self.eval_rhs(rhs)?;
        let value = match op {
            "=" => rval,
            "+=" => lval.wrapping_add(rval),
            "-=" => lval.wrapping_sub(rval),
            "*=" => lval.wrapping_mul(rval),
            "/=" | "%=" if rval == 0 => {
                return Err(ScriptError::DivisionByZero {
                    lhs: lhs.to_string(),
                });
            }
            "/=" => lval.wrapping_div(rval),
            "%=" => lval.wrapping_rem(rval),
            _ => return Err(ScriptError::InvalidOperator { op: op.to_string() }),
        };
        self.set(index, value)
    }

    /// 求比较表达式的值（`if`/`unless`）
    pub fn compare(&self, lhs: &str, op: &str, rhs: &str) -> Result<bool, ScriptError> {
        if let Some(index) = parse_name_ref(lhs)? {
            let lval = self.name(index);
            return match op {
                "==" => Ok(lval == rhs),
                "!=" => Ok(lval != rhs),
                _ => Err(ScriptError::InvalidOperator { op: op.to_string() }),
            };
        }

        let lval = self.get(parse_var_ref(lhs)?);
        let rval = self.eval_rhs(rhs)?;
        match op {
            ">" => Ok(lval > rval),
            ">=" => Ok(lval >= rval),
            "==" => Ok(lval == rval),
            "<=" => Ok(lval <= rval),
            "<" => Ok(lval < rval),
            "!=" => Ok(lval != rval),
            _ => Err(ScriptError::InvalidOperator { op: op.to_string() }),
        }
    }

    fn eval_rhs(&self, rhs: &str) -> Result<i32, ScriptError> {
        match rhs {
            "true" | "yes" | "はい" => Ok(1),
            "false" | "no" | "いいえ" => Ok(0),
            _ if rhs.starts_with('$') && rhs.len() > 1 => Ok(self.get(parse_var_ref(rhs)?)),
            _ => Ok(parse_leading_int(rhs)),
        }
    }

    /// 展开文本中的变量引用
    ///
    /// - `$n` → 数值，`$$` → `$`，无效索引保留 `$`
    /// - `%a`..`%z` → 名字变量
    /// - `&1`..`&9` → 调用参数
    pub fn expand(&self, text: &str, cursor: &ScriptCursor) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.char_indices().peekable();

        while let Some((_, c)) = chars.next() {
            match c {
                '$' => {
                    if chars.next_if(|(_, n)| *n == '$').is_some() {
                        out.push('$');
                        continue;
                    }
                    let mut digits = String::new();
                    while digits.len() < 5 {
                        match chars.next_if(|(_, n)| n.is_ascii_digit()) {
                            Some((_, d)) => digits.push(d),
                            None => break,
                        }
                    }
                    match digits.parse::<usize>() {
                        Ok(index) if index < VAR_SIZE => out.push_str(&self.get(index).to_string()),
                        _ => {
                            out.push('$');
                            out.push_str(&digits);
                        }
                    }
                }
                '%' => match chars.next_if(|(_, n)| n.is_ascii_lowercase()) {
                    Some((_, n)) => out.push_str(self.name((n as u8 - b'a') as usize)),
                    None => out.push('%'),
                },
                '&' => match chars.next_if(|(_, n)| ('1'..='9').contains(n)) {
                    Some((_, n)) => out.push_str(cursor.call_arg((n as u8 - b'1') as usize)),
                    None => out.push('&'),
                },
                _ => out.push(c),
            }
        }

        out
    }
}

/// 解析 `$n` 形式的数值变量引用
fn parse_var_ref(s: &str) -> Result<usize, ScriptError> {
    let digits = s
        .strip_prefix('$')
        .filter(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()))
        .ok_or_else(|| ScriptError::InvalidVariable { name: s.to_string() })?;
    let index: i64 = digits
        .parse()
        .map_err(|_| ScriptError::InvalidVariable { name: s.to_string() })?;
    if index < 0 || index >= VAR_SIZE as i64 {
        return Err(ScriptError::VariableIndex { index });
    }
    Ok(index as usize)
}

/// 解析 `%a` 形式的名字变量引用（不是名字变量时返回 `None`）
fn parse_name_ref(s: &str) -> Result<Option<usize>, ScriptError> {
    let Some(rest) = s.strip_prefix('%') else {
        return Ok(None);
    };
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_lowercase() => Ok(Some((c as u8 - b'a') as usize)),
        _ => Err(ScriptError::InvalidVariable { name: s.to_string() }),
    }
}

/// 按 C `atoi` 的规则解析整数前缀（无法解析时为 0）
fn parse_leading_int(s: &str) -> i32 {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, s.strip_prefix('+').unwrap_or(s)),
    };
    let mut value: i64 = 0;
    for c in digits.chars().take_while(|c| c.is_ascii_digit()) {
        value = (value * 10 + i64::from(c as u8 - b'0')).min(i64::from(i32::MAX) + 1);
    }
    (sign * value).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
