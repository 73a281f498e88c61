//! 命令解释器
//!
//! 把一行操作员输入解析为 [`Directive`]。解释器从不失败：
//! 出错的输入解析为 `NoOp`，并在 [`Interpretation::error`] 中给出原因。
//!
//! # 模式
//!
//! - `=` 在任何模式下都切换模式，不产生指令
//! - Reading 模式：单个数字选择坐标系，其余内容按位姿字面量解析（FullControl）
//! - Command 模式：首字母查 [`COMMAND_TABLE`](crate::jog::COMMAND_TABLE)，单个数字选择坐标系
//!
//! # 轨迹语法
//!
//! ```text
//! p|<A>|<步数>|<B>     SteppedMove，步数字段也可以放在最后：p|<A>|<B>|<步数>
//! p|<B>|<步数>         SteppedMove，从当前位姿出发
//! c|<A>|<次数>|<B>     CircularRepeat，次数字段同样可以放在最后
//! c|<次数>|<A>|<B>     计数也可以放在最前，仅当第 2 个和最后一个字段都不是单个整数时
//! o|<P1>|<P2>|...      PositionalList，至少 2 个点
//! ```

use crate::directive::{Directive, Mode, Sign};
use crate::error::InputError;
use crate::jog::{Command, JogCoefficient, lookup};
use crate::literal::parse_point;
use armlink_protocol::{Axis, CoordinateSystem, Point};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

/// 模式切换输入
pub const MODE_TOGGLE: &str = "=";

/// 轨迹字段分隔符
const PIPE: char = '|';

/// 解释结果
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub directive: Directive,
    pub error: Option<InputError>,
}

impl Interpretation {
    fn accepted(directive: Directive) -> Self {
        Self {
            directive,
            error: None,
        }
    }

    fn rejected(error: InputError) -> Self {
        Self {
            directive: Directive::NoOp,
            error: Some(error),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.error.is_some()
    }
}

/// 命令解释器
#[derive(Debug)]
pub struct CommandInterpreter {
    mode: Mode,
    coordinate_system: CoordinateSystem,
    jog: Arc<JogCoefficient>,
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self::new(
            Mode::Command,
            CoordinateSystem::World,
            Arc::new(JogCoefficient::default()),
        )
    }
}

impl CommandInterpreter {
    pub fn new(mode: Mode, coordinate_system: CoordinateSystem, jog: Arc<JogCoefficient>) -> Self {
        Self {
            mode,
            coordinate_system,
            jog,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.coordinate_system
    }

    pub fn jog_coefficient(&self) -> &Arc<JogCoefficient> {
        &self.jog
    }

    /// 解释一行输入
    ///
    /// `pose` 是当前目标位姿，用作位姿字面量缺省字段的基准。
    pub fn interpret(&mut self, line: &str, pose: &Point) -> Interpretation {
        let line = line.trim().to_lowercase();

        if line == MODE_TOGGLE {
            self.mode = self.mode.toggled();
            debug!("Input mode switched to {}", self.mode);
            return Interpretation::accepted(Directive::NoOp);
        }
        if line.is_empty() {
            return Interpretation::accepted(Directive::NoOp);
        }

        let result = match self.mode {
            Mode::Reading => self.interpret_reading(&line, pose),
            Mode::Command => self.interpret_command(&line, pose),
        };

        match result {
            Ok(directive) => {
                if let Directive::SetCoordinateSystem(system) = directive {
                    self.coordinate_system = system;
                }
                Interpretation::accepted(directive)
            },
            Err(e) => {
                debug!("Rejected input {:?}: {}", line, e);
                Interpretation::rejected(e)
            },
        }
    }

    fn interpret_reading(&self, line: &str, pose: &Point) -> Result<Directive, InputError> {
        if let Some(c) = single_char(line)
            && c.is_ascii_digit()
        {
            return select_coordinate_system(c);
        }
        parse_point(line, pose).map(Directive::FullControl)
    }

    fn interpret_command(&self, line: &str, pose: &Point) -> Result<Directive, InputError> {
        let mut chars = line.chars();
        let Some(letter) = chars.next() else {
            return Ok(Directive::NoOp);
        };
        let payload = chars.as_str();

        if letter.is_ascii_digit() {
            expect_no_payload(letter, payload)?;
            return select_coordinate_system(letter);
        }

        let command = lookup(letter).ok_or(InputError::UnknownCommand { input: letter })?;
        match command {
            Command::Home => {
                expect_no_payload(letter, payload)?;
                Ok(Directive::Home)
            },
            Command::LoadFromFile => {
                expect_no_payload(letter, payload)?;
                Ok(Directive::LoadFromFile)
            },
            Command::Jog(axis, sign) => self.jog(axis, sign, payload),
            Command::SteppedMove => {
                let mut fields = pipe_fields(letter, payload)?;
                let steps = take_count(letter, &mut fields)?;
                let points = parse_points(&fields, pose)?;
                let (a, b) = match points.as_slice() {
                    [] => {
                        return Err(InputError::TooFewPoints {
                            command: letter,
                            expected: 1,
                            actual: 0,
                        });
                    },
                    [b] => (*pose, *b),
                    [a, b, ..] => (*a, *b),
                };
                Ok(Directive::SteppedMove { a, b, steps })
            },
            Command::CircularRepeat => {
                let mut fields = pipe_fields(letter, payload)?;
                let iterations = take_count(letter, &mut fields)?;
                let points = parse_points(&fields, pose)?;
                match points.as_slice() {
                    [a, b, ..] => Ok(Directive::CircularRepeat {
                        a: *a,
                        b: *b,
                        iterations,
                    }),
                    _ => Err(InputError::TooFewPoints {
                        command: letter,
                        expected: 2,
                        actual: points.len(),
                    }),
                }
            },
            Command::PositionalList => {
                let fields = pipe_fields(letter, payload)?;
                let points = parse_points(&fields, pose)?;
                if points.len() < 2 {
                    return Err(InputError::TooFewPoints {
                        command: letter,
                        expected: 2,
                        actual: points.len(),
                    });
                }
                Ok(Directive::PositionalList(points))
            },
        }
    }

    fn jog(&self, axis: Axis, sign: Sign, payload: &str) -> Result<Directive, InputError> {
        let payload = payload.trim();
        let step = if payload.is_empty() {
            self.jog.get()
        } else {
            let step = payload
                .parse::<i32>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| InputError::InvalidJogStep {
                    payload: payload.to_string(),
                })?;
            self.jog.set(step);
            step
        };
        Ok(Directive::Jog { axis, sign, step })
    }
}

fn single_char(line: &str) -> Option<char> {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn select_coordinate_system(selector: char) -> Result<Directive, InputError> {
    CoordinateSystem::from_selector(selector)
        .map(Directive::SetCoordinateSystem)
        .ok_or(InputError::UnknownCoordinateSystem { selector })
}

fn expect_no_payload(command: char, payload: &str) -> Result<(), InputError> {
    if payload.is_empty() {
        Ok(())
    } else {
        Err(InputError::UnexpectedPayload {
            command,
            payload: payload.to_string(),
        })
    }
}

/// 拆分 `|` 分隔的字段（不含命令字母），忽略末尾的空字段
fn pipe_fields(command: char, payload: &str) -> Result<Vec<&str>, InputError> {
    let payload = payload.trim_start();
    let Some(rest) = payload.strip_prefix(PIPE) else {
        if payload.is_empty() {
            return Err(InputError::TooFewPoints {
                command,
                expected: 2,
                actual: 0,
            });
        }
        return Err(InputError::UnexpectedPayload {
            command,
            payload: payload.to_string(),
        });
    };

    let mut fields: Vec<&str> = rest.split(PIPE).map(str::trim).collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    Ok(fields)
}

fn is_single_integer(field: &str) -> bool {
    let mut tokens = field.split_whitespace();
    matches!(
        (tokens.next(), tokens.next()),
        (Some(token), None) if token.parse::<i64>().is_ok()
    )
}

/// 取出计数字段：优先第 2 个字段，其次最后一个字段，最后第 1 个字段
fn take_count(command: char, fields: &mut Vec<&str>) -> Result<NonZeroU32, InputError> {
    let index = if fields.len() > 1 && is_single_integer(fields[1]) {
        1
    } else if fields.len() > 1 && is_single_integer(fields[fields.len() - 1]) {
        fields.len() - 1
    } else if fields.len() > 1 && is_single_integer(fields[0]) {
        0
    } else {
        return Err(InputError::MissingCount { command });
    };

    let field = fields.remove(index);
    field
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| InputError::InvalidCount {
            field: field.to_string(),
        })
}

/// 解析所有位姿字段，任何一个失败则整体失败
fn parse_points(fields: &[&str], pose: &Point) -> Result<Vec<Point>, InputError> {
    fields.iter().map(|f| parse_point(f, pose)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "985000 0 940000 -180000 0 0 10 2 0";
    const B: &str = "900000 0 940000 -180000 0 0 10 2 0";

    fn interpreter() -> CommandInterpreter {
        CommandInterpreter::default()
    }

    fn home() -> Point {
        Point::home()
    }

    fn x(p: &Point) -> i32 {
        p.coord(Axis::X)
    }

    #[test]
    fn test_equals_toggles_mode_in_both_modes() {
        let mut it = interpreter();
        assert_eq!(it.mode(), Mode::Command);

        let r = it.interpret("=", &home());
        assert_eq!(r.directive, Directive::NoOp);
        assert!(!r.is_rejected());
        assert_eq!(it.mode(), Mode::Reading);

        it.interpret("  =  ", &home());
        assert_eq!(it.mode(), Mode::Command);
    }

    #[test]
    fn test_jog_with_override_persists() {
        let mut it = interpreter();
        let r = it.interpret("w500", &home());
        assert_eq!(
            r.directive,
            Directive::Jog {
                axis: Axis::Y,
                sign: Sign::Positive,
                step: 500
            }
        );
        assert_eq!(it.jog_coefficient().get(), 500);

        let r = it.interpret("w", &home());
        assert_eq!(
            r.directive,
            Directive::Jog {
                axis: Axis::Y,
                sign: Sign::Positive,
                step: 500
            }
        );

        let r = it.interpret("a", &home());
        assert_eq!(
            r.directive,
            Directive::Jog {
                axis: Axis::X,
                sign: Sign::Negative,
                step: 500
            }
        );
    }

    #[test]
    fn test_jog_default_coefficient() {
        let mut it = interpreter();
        let r = it.interpret("E", &home());
        assert_eq!(
            r.directive,
            Directive::Jog {
                axis: Axis::Z,
                sign: Sign::Positive,
                step: 10_000
            }
        );
    }

    #[test]
    fn test_jog_rejects_bad_override() {
        let mut it = interpreter();
        for input in ["w0", "w-5", "wabc", "w1.5"] {
            let r = it.interpret(input, &home());
            assert_eq!(r.directive, Directive::NoOp, "{}", input);
            assert!(matches!(r.error, Some(InputError::InvalidJogStep { .. })));
        }
        assert_eq!(it.jog_coefficient().get(), 10_000);
    }

    #[test]
    fn test_home_and_load_take_no_payload() {
        let mut it = interpreter();
        assert_eq!(it.interpret("z", &home()).directive, Directive::Home);
        assert_eq!(it.interpret("x", &home()).directive, Directive::LoadFromFile);

        let r = it.interpret("z1", &home());
        assert_eq!(r.directive, Directive::NoOp);
        assert_eq!(
            r.error,
            Some(InputError::UnexpectedPayload {
                command: 'z',
                payload: "1".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_command() {
        let mut it = interpreter();
        let r = it.interpret("k", &home());
        assert_eq!(r.error, Some(InputError::UnknownCommand { input: 'k' }));
    }

    #[test]
    fn test_coordinate_system_selection() {
        let mut it = interpreter();
        let r = it.interpret("1", &home());
        assert_eq!(
            r.directive,
            Directive::SetCoordinateSystem(CoordinateSystem::Joint)
        );
        assert_eq!(it.coordinate_system(), CoordinateSystem::Joint);
        assert_eq!(it.mode(), Mode::Command);

        let r = it.interpret("7", &home());
        assert_eq!(
            r.error,
            Some(InputError::UnknownCoordinateSystem { selector: '7' })
        );
        assert!(it.interpret("12", &home()).is_rejected());
        assert_eq!(it.coordinate_system(), CoordinateSystem::Joint);

        // Reading 模式下同样可以选择，且不切换模式
        it.set_mode(Mode::Reading);
        let r = it.interpret("2", &home());
        assert_eq!(
            r.directive,
            Directive::SetCoordinateSystem(CoordinateSystem::World)
        );
        assert_eq!(it.mode(), Mode::Reading);
    }

    #[test]
    fn test_reading_mode_full_control() {
        let mut it = interpreter();
        it.set_mode(Mode::Reading);

        let r = it.interpret("900000 5", &home());
        match r.directive {
            Directive::FullControl(p) => {
                assert_eq!(p.coords(), [900_000, 5, 940_000, -180_000, 0, 0]);
            },
            other => panic!("Expected FullControl, got {:?}", other),
        }

        let r = it.interpret("hello", &home());
        assert_eq!(r.directive, Directive::NoOp);
        assert!(matches!(r.error, Some(InputError::InvalidPoint { .. })));
    }

    #[test]
    fn test_stepped_move_count_in_second_field() {
        let mut it = interpreter();
        let r = it.interpret(&format!("p|{}|5|{}", A, B), &home());
        match r.directive {
            Directive::SteppedMove { a, b, steps } => {
                assert_eq!(x(&a), 985_000);
                assert_eq!(x(&b), 900_000);
                assert_eq!(steps.get(), 5);
            },
            other => panic!("Expected SteppedMove, got {:?}", other),
        }
    }

    #[test]
    fn test_stepped_move_count_in_last_field() {
        let mut it = interpreter();
        let r = it.interpret(&format!("p|{}|{}|5", A, B), &home());
        match r.directive {
            Directive::SteppedMove { a, b, steps } => {
                assert_eq!(x(&a), 985_000);
                assert_eq!(x(&b), 900_000);
                assert_eq!(steps.get(), 5);
            },
            other => panic!("Expected SteppedMove, got {:?}", other),
        }
    }

    #[test]
    fn test_stepped_move_from_current_pose() {
        let mut it = interpreter();
        let pose = home().with_coord(Axis::Y, 1000);
        let r = it.interpret(&format!("p|{}|4", B), &pose);
        match r.directive {
            Directive::SteppedMove { a, b, steps } => {
                assert_eq!(a, pose);
                assert_eq!(x(&b), 900_000);
                assert_eq!(steps.get(), 4);
            },
            other => panic!("Expected SteppedMove, got {:?}", other),
        }
    }

    #[test]
    fn test_stepped_move_errors() {
        let mut it = interpreter();
        let cases = [
            (format!("p|{}|0|{}", A, B), "zero count"),
            (format!("p|{}|{}", A, B), "no count"),
            (format!("p|{}|5|1 2 x", A), "bad point"),
            ("p".to_string(), "no payload"),
            (format!("p{}|5|{}", A, B), "missing pipe"),
        ];
        for (input, why) in cases {
            let r = it.interpret(&input, &home());
            assert_eq!(r.directive, Directive::NoOp, "{}", why);
            assert!(r.is_rejected(), "{}", why);
        }

        let r = it.interpret(&format!("p|{}|-3|{}", A, B), &home());
        assert_eq!(
            r.error,
            Some(InputError::InvalidCount {
                field: "-3".to_string()
            })
        );
    }

    #[test]
    fn test_circular_repeat() {
        let mut it = interpreter();
        let r = it.interpret(&format!("c|{}|3|{}", A, B), &home());
        match r.directive {
            Directive::CircularRepeat { a, b, iterations } => {
                assert_eq!(x(&a), 985_000);
                assert_eq!(x(&b), 900_000);
                assert_eq!(iterations.get(), 3);
            },
            other => panic!("Expected CircularRepeat, got {:?}", other),
        }

        // 只有一个点
        let r = it.interpret(&format!("c|{}|3", A), &home());
        assert_eq!(
            r.error,
            Some(InputError::TooFewPoints {
                command: 'c',
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_count_in_first_field() {
        let mut it = interpreter();
        let r = it.interpret(&format!("c|3|{}|{}", A, B), &home());
        match r.directive {
            Directive::CircularRepeat { a, b, iterations } => {
                assert_eq!(x(&a), 985_000);
                assert_eq!(x(&b), 900_000);
                assert_eq!(iterations.get(), 3);
            },
            other => panic!("Expected CircularRepeat, got {:?}", other),
        }

        let r = it.interpret(&format!("p|4|{}|{}", A, B), &home());
        match r.directive {
            Directive::SteppedMove { a, b, steps } => {
                assert_eq!(x(&a), 985_000);
                assert_eq!(x(&b), 900_000);
                assert_eq!(steps.get(), 4);
            },
            other => panic!("Expected SteppedMove, got {:?}", other),
        }

        // 第 2 个字段是单个整数时仍然优先取第 2 个
        let r = it.interpret("c|985000|3|900000", &home());
        match r.directive {
            Directive::CircularRepeat { a, b, iterations } => {
                assert_eq!(x(&a), 985_000);
                assert_eq!(x(&b), 900_000);
                assert_eq!(iterations.get(), 3);
            },
            other => panic!("Expected CircularRepeat, got {:?}", other),
        }

        let r = it.interpret(&format!("c|0|{}|{}", A, B), &home());
        assert_eq!(
            r.error,
            Some(InputError::InvalidCount {
                field: "0".to_string()
            })
        );

        // 计数在最前但只剩一个点
        let r = it.interpret(&format!("c|3|{}", A), &home());
        assert_eq!(
            r.error,
            Some(InputError::TooFewPoints {
                command: 'c',
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_positional_list() {
        let mut it = interpreter();
        let r = it.interpret(&format!("o|{}|{}|950000|", A, B), &home());
        match r.directive {
            Directive::PositionalList(points) => {
                let xs: Vec<i32> = points.iter().map(x).collect();
                assert_eq!(xs, vec![985_000, 900_000, 950_000]);
            },
            other => panic!("Expected PositionalList, got {:?}", other),
        }

        let r = it.interpret(&format!("o|{}", A), &home());
        assert!(matches!(r.error, Some(InputError::TooFewPoints { .. })));

        // 任何一个点无效则整体无效
        let r = it.interpret(&format!("o|{}|oops|{}", A, B), &home());
        assert_eq!(r.directive, Directive::NoOp);
    }

    #[test]
    fn test_empty_line_is_noop_without_error() {
        let mut it = interpreter();
        let r = it.interpret("   ", &home());
        assert_eq!(r.directive, Directive::NoOp);
        assert!(!r.is_rejected());
    }
}
