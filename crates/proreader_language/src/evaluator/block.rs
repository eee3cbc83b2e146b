//! Statement execution: blocks, assignments, loops and calls.

use std::sync::Arc;

use proreader_foundation::{
    Error, ErrorKind, EvalLimit, FunctionKind, Result, ValueList, ValueMap,
};
use regex::RegexBuilder;
use tracing::trace;

use super::builtin::{ExpandFunc, TestFunc};
use super::expand::{skip_args, skip_words};
use super::functions::FunctionDef;
use super::{Evaluator, Flow, Position};
use crate::handler::MessageKind;
use crate::opcode::{Opcode, ProFile};
use crate::token::AssignOp;

/// Iterations after which `for(ever)` gives up.
const MAX_FOREVER_ITERATIONS: usize = 1000;

enum LoopItems {
    List(Vec<String>),
    Forever,
}

impl Evaluator<'_> {
    /// Runs `file.ops()[start..end]`. An error is reported here unless an
    /// inner block already did.
    pub(super) fn visit_block(&mut self, file: &Arc<ProFile>, start: usize, end: usize) -> Result<Flow> {
        match self.visit_ops(file, start, end) {
            Err(err) => Err(self.fail(err)),
            ok => ok,
        }
    }

    fn visit_ops(&mut self, file: &Arc<ProFile>, start: usize, end: usize) -> Result<Flow> {
        let ops = file.ops();
        let mut pc = start;
        let mut okey = true;
        let mut or_op = false;
        let mut invert = false;
        let mut curr = ValueList::new();

        while pc < end {
            match ops[pc] {
                Opcode::Line(line) => {
                    pc += 1;
                    self.current = Some(Position {
                        file: Arc::clone(file),
                        line,
                    });
                }
                Opcode::Literal(_)
                | Opcode::Variable { .. }
                | Opcode::Property { .. }
                | Opcode::Environment { .. }
                | Opcode::FuncCall { .. }
                | Opcode::WordBreak => {
                    let mut end = pc;
                    skip_words(ops, &mut end);
                    if okey == or_op && ops.get(end) == Some(&Opcode::Condition) {
                        // Outcome already decided; the term is not expanded.
                        pc = end;
                        curr.clear();
                    } else {
                        curr = self.expand_words(file, &mut pc)?;
                    }
                }
                Opcode::Assign(op) => {
                    pc += 1;
                    let lhs = std::mem::take(&mut curr);
                    self.visit_assignment(file, &mut pc, &lhs, op)?;
                }
                Opcode::Condition => {
                    pc += 1;
                    if okey != or_op {
                        if curr.len() == 1 {
                            okey = self.is_active_config(&curr[0], true) ^ invert;
                        } else {
                            self.report(MessageKind::EvalError, "Conditional must expand to exactly one word.");
                            okey = false;
                        }
                    }
                    or_op = !okey;
                    invert = false;
                    curr.clear();
                }
                Opcode::TestCall(name) => {
                    pc += 1;
                    if okey == or_op {
                        skip_args(ops, &mut pc);
                    } else {
                        let args = self.expand_args(file, &mut pc)?;
                        okey = self.call_test(file.string(name), args)? ^ invert;
                    }
                    or_op = !okey;
                    invert = false;
                }
                Opcode::Not => {
                    pc += 1;
                    invert = !invert;
                }
                Opcode::And => {
                    pc += 1;
                    or_op = false;
                }
                Opcode::Or => {
                    pc += 1;
                    or_op = true;
                }
                Opcode::Branch { then_len, else_len } => {
                    pc += 1;
                    let (from, to) = if okey {
                        (pc, pc + then_len)
                    } else {
                        (pc + then_len, pc + then_len + else_len)
                    };
                    pc += then_len + else_len;
                    if from < to {
                        let flow = self.visit_block(file, from, to)?;
                        if matches!(flow, Flow::Break | Flow::Next | Flow::Return) {
                            return Ok(flow);
                        }
                    }
                    okey = true;
                    or_op = false;
                }
                Opcode::ForLoop { var, expr_len, body_len } => {
                    pc += 1;
                    let expr_end = pc + expr_len;
                    let body_end = expr_end + body_len;
                    let flow = self.visit_loop(file, file.string(var), pc, expr_end, body_end)?;
                    pc = body_end;
                    if flow == Flow::Return {
                        return Ok(flow);
                    }
                    okey = true;
                    or_op = false;
                }
                Opcode::FunctionDef { kind, name, body_len } => {
                    pc += 1;
                    let def = FunctionDef::new(Arc::clone(file), pc, body_len);
                    trace!(name = file.string(name), %kind, "defining function");
                    self.functions.define(kind, file.string(name), def);
                    pc += body_len;
                    okey = true;
                    or_op = false;
                }
                Opcode::Return => {
                    self.return_value = std::mem::take(&mut curr);
                    return Ok(Flow::Return);
                }
                Opcode::Break => return Ok(Flow::Break),
                Opcode::Next => return Ok(Flow::Next),
                op @ (Opcode::ArgSeparator | Opcode::FuncTerminator | Opcode::ValueTerminator) => {
                    return Err(Error::new(ErrorKind::Internal(format!(
                        "unexpected {op:?} at statement level"
                    ))));
                }
            }
        }
        Ok(Flow::from(okey))
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    fn visit_assignment(
        &mut self,
        file: &Arc<ProFile>,
        pc: &mut usize,
        lhs: &ValueList,
        op: AssignOp,
    ) -> Result<()> {
        let value = self.expand_words(file, pc)?;
        if file.ops().get(*pc) == Some(&Opcode::ValueTerminator) {
            *pc += 1;
        }
        if lhs.len() != 1 {
            return Err(Error::eval(
                "Left hand side of assignment must expand to exactly one word.",
            ));
        }
        let name = self.map_variable(&lhs[0]).to_string();

        match op {
            AssignOp::Set => {
                self.scopes.set(&name, zip_empty(value));
                if name == "TEMPLATE" {
                    self.set_template();
                }
            }
            AssignOp::Append => {
                self.scopes.entry(&name).append(zip_empty(value));
            }
            AssignOp::AppendUnique => {
                self.scopes.entry(&name).append_unique(zip_empty(value));
            }
            AssignOp::Remove => {
                if let Some(mut values) = self.scopes.get(&name).cloned() {
                    values.remove_all(&value);
                    self.scopes.set(&name, values);
                }
            }
            AssignOp::Replace => {
                let expr = value.join(" ");
                let mut values = self.values(&name);
                apply_substitution(&mut values, &expr)?;
                self.scopes.set(&name, values);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Loops
    // =========================================================================

    fn loop_items(&mut self, var: &str, words: &ValueList) -> Option<LoopItems> {
        match words.len() {
            0 => Some(LoopItems::List(Vec::new())),
            1 => {
                let word = &words[0];
                if var.is_empty() {
                    return (word == "ever").then_some(LoopItems::Forever);
                }
                let name = self.map_variable(word).to_string();
                let list = self.values(&name);
                if !list.is_empty() {
                    return Some(LoopItems::List(list.into_vec()));
                }
                if word == "ever" || word == "forever" {
                    return Some(LoopItems::Forever);
                }
                Some(LoopItems::List(integer_range(word).unwrap_or_default()))
            }
            _ if var.is_empty() => None,
            _ => Some(LoopItems::List(words.to_vec())),
        }
    }

    fn visit_loop(
        &mut self,
        file: &Arc<ProFile>,
        var: &str,
        expr_start: usize,
        body_start: usize,
        body_end: usize,
    ) -> Result<Flow> {
        let mut pc = expr_start;
        let words = self.expand_words(file, &mut pc)?;
        let Some(items) = self.loop_items(var, &words) else {
            self.report(MessageKind::EvalError, "Invalid loop expression.");
            return Ok(Flow::False);
        };

        let saved = (!var.is_empty()).then(|| self.scopes.get(var).cloned());
        let mut flow = Flow::True;
        let mut index = 0usize;
        let mut list = match &items {
            LoopItems::List(values) => values.clone().into_iter(),
            LoopItems::Forever => Vec::new().into_iter(),
        };

        loop {
            match items {
                LoopItems::List(_) => {
                    let Some(value) = list.next() else { break };
                    if value.is_empty() {
                        continue;
                    }
                    self.scopes.set(var, ValueList::single(value));
                }
                LoopItems::Forever => {
                    if index >= MAX_FOREVER_ITERATIONS {
                        self.report(
                            MessageKind::EvalError,
                            &format!("Ran into infinite loop (> {MAX_FOREVER_ITERATIONS} iterations)."),
                        );
                        break;
                    }
                    if !var.is_empty() {
                        self.scopes.set(var, ValueList::single(index.to_string()));
                    }
                }
            }
            index += 1;

            match self.visit_block(file, body_start, body_end)? {
                Flow::Break => break,
                Flow::Return => {
                    flow = Flow::Return;
                    break;
                }
                Flow::True | Flow::False | Flow::Next => {}
            }
        }

        match saved {
            Some(Some(values)) => self.scopes.set(var, values),
            Some(None) => {
                self.scopes.remove(var);
            }
            None => {}
        }
        Ok(flow)
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// Runs a user function in a new frame holding its arguments.
    fn call_user(&mut self, name: &str, def: &FunctionDef, args: Vec<ValueList>) -> Result<Flow> {
        if self.call_depth >= self.limits.max_call_depth {
            return Err(Error::limit_exceeded(EvalLimit::MaxCallDepth {
                limit: self.limits.max_call_depth,
                function: Some(name.to_string()),
            }));
        }

        let mut frame = ValueMap::new();
        let mut all = ValueList::new();
        frame.insert("ARGC", ValueList::single(args.len().to_string()));
        for (i, arg) in args.into_iter().enumerate() {
            all.append(arg.iter().cloned());
            frame.insert((i + 1).to_string(), arg);
        }
        frame.insert("ARGS", all);

        let depth = self.scopes.depth();
        self.scopes.push_frame(frame);
        self.location_stack.push(self.current.replace(Position::new(def.file())));
        self.call_depth += 1;
        trace!(name, depth = self.call_depth, "calling user function");

        let result = self.visit_block(def.file(), def.start(), def.end());

        self.call_depth -= 1;
        self.current = self.location_stack.pop().flatten();
        self.scopes.truncate(depth);

        match result? {
            Flow::Break => Err(Error::new(ErrorKind::UnexpectedControl("break"))),
            Flow::Next => Err(Error::new(ErrorKind::UnexpectedControl("next"))),
            flow => Ok(flow),
        }
    }

    /// Calls a test function, built-in first.
    pub(super) fn call_test(&mut self, name: &str, args: Vec<ValueList>) -> Result<bool> {
        if let Some(func) = TestFunc::from_name(name) {
            let args = join_args(args);
            func.check_arity(name, args.len())?;
            return self.evaluate_builtin_test(func, name, &args);
        }
        let Some(def) = self.functions.get(FunctionKind::Test, name).cloned() else {
            return Err(Error::unknown_function(name, FunctionKind::Test));
        };

        self.return_value.clear();
        match self.call_user(name, &def, args)? {
            Flow::Return => {
                let value = std::mem::take(&mut self.return_value);
                Ok(self.test_return_value(name, &value))
            }
            flow => Ok(flow == Flow::True),
        }
    }

    fn test_return_value(&mut self, name: &str, value: &ValueList) -> bool {
        let Some(first) = value.first() else {
            return true;
        };
        if let Ok(number) = first.parse::<i64>() {
            return number != 0;
        }
        match first.as_str() {
            "true" => true,
            "false" => false,
            _ => {
                self.report(
                    MessageKind::EvalError,
                    &format!("Unexpected return value from test '{name}': {}.", value.join(" ")),
                );
                false
            }
        }
    }

    /// Calls a replace function, built-in first.
    pub(super) fn call_replace(&mut self, name: &str, args: Vec<ValueList>) -> Result<ValueList> {
        if let Some(func) = ExpandFunc::from_name(name) {
            let args = join_args(args);
            func.check_arity(name, args.len())?;
            return self.evaluate_builtin_expand(func, &args);
        }
        let Some(def) = self.functions.get(FunctionKind::Replace, name).cloned() else {
            return Err(Error::unknown_function(name, FunctionKind::Replace));
        };

        self.return_value.clear();
        match self.call_user(name, &def, args)? {
            Flow::Return => Ok(std::mem::take(&mut self.return_value)),
            _ => Ok(ValueList::new()),
        }
    }
}

fn zip_empty(values: ValueList) -> ValueList {
    values.into_iter().filter(|v| !v.is_empty()).collect()
}

/// Built-ins take each argument as a single string.
fn join_args(args: Vec<ValueList>) -> Vec<String> {
    args.into_iter().map(|arg| arg.join(" ")).collect()
}

/// `a..b` in either direction, inclusive.
fn integer_range(word: &str) -> Option<Vec<String>> {
    let (start, end) = word.split_once("..")?;
    let start: i64 = start.trim().parse().ok()?;
    let end: i64 = end.trim().parse().ok()?;
    let values = if start <= end {
        (start..=end).map(|i| i.to_string()).collect()
    } else {
        (end..=start).rev().map(|i| i.to_string()).collect()
    };
    Some(values)
}

/// Applies `s<sep>pattern<sep>replacement<sep>[flags]` to every element.
/// Elements that become empty are dropped.
fn apply_substitution(values: &mut ValueList, expr: &str) -> Result<()> {
    let mut chars = expr.chars();
    let (Some('s'), Some(sep)) = (chars.next(), chars.next()) else {
        return Err(Error::eval("The ~= operator can handle only the s/// function."));
    };
    let parts: Vec<&str> = chars.as_str().split(sep).collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(Error::eval("The s/// function expects 3 or 4 arguments."));
    }

    let flags = parts.get(2).copied().unwrap_or("");
    let global = flags.contains('g');
    let pattern = if flags.contains('q') {
        regex::escape(parts[0])
    } else {
        parts[0].to_string()
    };
    let re = RegexBuilder::new(&pattern)
        .case_insensitive(flags.contains('i'))
        .build()
        .map_err(|err| {
            Error::new(ErrorKind::InvalidRegex {
                pattern: pattern.clone(),
                message: err.to_string(),
            })
        })?;
    let replacement = convert_replacement(parts[1]);

    let replaced: Vec<String> = values
        .iter()
        .map(|value| {
            if global {
                re.replace_all(value, replacement.as_str()).into_owned()
            } else {
                re.replace(value, replacement.as_str()).into_owned()
            }
        })
        .filter(|value| !value.is_empty())
        .collect();
    *values = ValueList::from(replaced);
    Ok(())
}

/// Translates `\1` back-references to `${1}` and escapes literal `$`.
pub(super) fn convert_replacement(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.peek() {
                Some(d) if d.is_ascii_digit() => {
                    out.push_str("${");
                    out.push(*d);
                    out.push('}');
                    chars.next();
                }
                Some(_) => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                None => out.push('\\'),
            },
            c => out.push(c),
        }
    }
    out
}
