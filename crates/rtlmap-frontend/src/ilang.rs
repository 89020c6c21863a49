//! Reader for the native netlist dialect
//!
//! The dialect is line-oriented: one statement per line, nesting closed by
//! `end`. It is the exact textual form of the IR and the format the writer
//! emits, so designs round-trip losslessly.
//!
//! ```text
//! attribute \top 1
//! module \counter
//!   wire width 8 input 1 \d
//!   wire width 8 output 2 \q
//!   cell $dff $reg
//!     parameter \WIDTH 8
//!     connect \D \d
//!     connect \Q \q
//!   end
//!   connect \q_alias \q
//! end
//! ```

use crate::error::{FrontendError, Result};
use logos::Logos;
use rtlmap_netlist::{
    Attributes, Cell, Const, Design, IdString, Memory, Module, Process, SigSpec, State, SyncEdge,
    SyncRule, Wire,
};

/// Tokens of the native dialect. Statements never span lines, so the lexer
/// runs per line and newlines never appear here.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"#[^\n]*")]
enum Token {
    #[token("module")]
    Module,
    #[token("attribute")]
    Attribute,
    #[token("parameter")]
    Parameter,
    #[token("signed")]
    Signed,
    #[token("wire")]
    Wire,
    #[token("width")]
    Width,
    #[token("input")]
    Input,
    #[token("output")]
    Output,
    #[token("inout")]
    Inout,
    #[token("memory")]
    Memory,
    #[token("size")]
    Size,
    #[token("cell")]
    Cell,
    #[token("connect")]
    Connect,
    #[token("process")]
    Process,
    #[token("assign")]
    Assign,
    #[token("sync")]
    Sync,
    #[token("posedge")]
    Posedge,
    #[token("negedge")]
    Negedge,
    #[token("update")]
    Update,
    #[token("end")]
    End,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(":")]
    Colon,
    #[regex(r"[\\$][^ \t\r\n\[\]{}:]+", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r"[0-9]+'[01xz]*", |lex| lex.slice().to_string())]
    Value(String),
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); s[1..s.len() - 1].to_string() })]
    Str(String),
}

/// Parse the native dialect and merge the modules into `design`.
pub fn parse(design: &mut Design, text: &str, filename: &str) -> Result<()> {
    let mut parser = Parser {
        design,
        file: filename,
        module: None,
        cell: None,
        process: None,
        pending_attributes: Attributes::new(),
    };
    for (index, line) in text.lines().enumerate() {
        parser.statement(index + 1, line)?;
    }
    parser.finish()
}

struct Parser<'a> {
    design: &'a mut Design,
    file: &'a str,
    module: Option<Module>,
    cell: Option<Cell>,
    process: Option<Process>,
    pending_attributes: Attributes,
}

/// A lexed line with a cursor.
struct Line<'a> {
    file: &'a str,
    number: usize,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Line<'a> {
    fn lex(file: &'a str, number: usize, text: &str) -> Result<Self> {
        let mut tokens = Vec::new();
        for item in Token::lexer(text) {
            match item {
                Ok(token) => tokens.push(token),
                Err(()) => {
                    return Err(FrontendError::parse(file, number, "unrecognized token"));
                }
            }
        }
        Ok(Line { file, number, tokens, pos: 0 })
    }

    fn error(&self, message: impl Into<String>) -> FrontendError {
        FrontendError::parse(self.file, self.number, message)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<IdString> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(IdString::new(name)),
            _ => Err(self.error("expected identifier")),
        }
    }

    fn integer(&mut self) -> Result<usize> {
        match self.next() {
            Some(Token::Int(value)) if value >= 0 => Ok(value as usize),
            _ => Err(self.error("expected non-negative integer")),
        }
    }

    fn done(&mut self) -> Result<()> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(self.error("trailing tokens after statement"))
        }
    }

    fn constant(&mut self) -> Result<Const> {
        match self.next() {
            Some(Token::Value(text)) => parse_value(&text).ok_or_else(|| {
                self.error(format!("bad constant `{}`", text))
            }),
            Some(Token::Int(value)) => Ok(Const::from_i32(value as i32)),
            Some(Token::Str(text)) => Ok(Const::from_str_value(&text)),
            _ => Err(self.error("expected constant")),
        }
    }

    /// Parse a signal reference, resolving wire widths against `module`.
    fn sigspec(&mut self, module: &Module) -> Result<SigSpec> {
        if self.eat(&Token::LBrace) {
            let mut parts = Vec::new();
            while !self.eat(&Token::RBrace) {
                if self.peek().is_none() {
                    return Err(self.error("unterminated concatenation"));
                }
                parts.push(self.sigspec_single(module)?);
            }
            // Source order is most significant first.
            let mut sig = SigSpec::empty();
            for part in parts.into_iter().rev() {
                sig.append(part);
            }
            Ok(sig)
        } else {
            self.sigspec_single(module)
        }
    }

    fn sigspec_single(&mut self, module: &Module) -> Result<SigSpec> {
        match self.next() {
            Some(Token::Ident(name)) => {
                let name = IdString::new(name);
                let wire = module
                    .wire(&name)
                    .ok_or_else(|| self.error(format!("reference to undeclared wire `{}`", name)))?;
                let full_width = wire.width;
                if self.eat(&Token::LBracket) {
                    let first = self.integer()?;
                    let (offset, width) = if self.eat(&Token::Colon) {
                        let lo = self.integer()?;
                        if first < lo {
                            return Err(self.error("slice bounds are [msb:lsb]"));
                        }
                        (lo, first - lo + 1)
                    } else {
                        (first, 1)
                    };
                    if !self.eat(&Token::RBracket) {
                        return Err(self.error("expected `]`"));
                    }
                    if offset + width > full_width {
                        return Err(self.error(format!("slice out of bounds for `{}`", name)));
                    }
                    Ok(SigSpec::wire_slice(name, offset, width))
                } else {
                    Ok(SigSpec::wire(name, full_width))
                }
            }
            Some(Token::Value(text)) => {
                let value = parse_value(&text)
                    .ok_or_else(|| self.error(format!("bad constant `{}`", text)))?;
                Ok(SigSpec::from(value))
            }
            Some(Token::Int(value)) => Ok(SigSpec::from(Const::from_i32(value as i32))),
            Some(Token::Str(text)) => Ok(SigSpec::from(Const::from_str_value(&text))),
            _ => Err(self.error("expected signal")),
        }
    }
}

/// Parse a `width'bits` constant; bit characters are most significant
/// first and are zero-extended to the declared width.
fn parse_value(text: &str) -> Option<Const> {
    let (width, digits) = text.split_once('\'')?;
    let width: usize = width.parse().ok()?;
    let mut bits = Vec::with_capacity(width);
    for c in digits.chars().rev() {
        bits.push(State::from_char(c)?);
    }
    if bits.len() > width {
        return None;
    }
    bits.resize(width, State::S0);
    Some(Const::from_bits(bits))
}

impl Parser<'_> {
    fn statement(&mut self, number: usize, text: &str) -> Result<()> {
        let mut line = Line::lex(self.file, number, text)?;
        let Some(first) = line.next() else {
            return Ok(());
        };
        match first {
            Token::Attribute => {
                let name = line.ident()?;
                let value = line.constant()?;
                line.done()?;
                self.pending_attributes.insert(name, value);
            }
            Token::Module => {
                if self.module.is_some() {
                    return Err(line.error("nested module"));
                }
                let name = line.ident()?;
                line.done()?;
                let mut module = Module::new(name);
                module.attributes = std::mem::take(&mut self.pending_attributes);
                self.module = Some(module);
            }
            Token::Wire => {
                let module = self.module.as_mut().ok_or_else(|| line.error("wire outside module"))?;
                let mut width = 1;
                let mut port_id = 0;
                let mut port_input = false;
                let mut port_output = false;
                loop {
                    match line.peek() {
                        Some(Token::Width) => {
                            line.next();
                            width = line.integer()?;
                        }
                        Some(Token::Input) => {
                            line.next();
                            port_id = line.integer()?;
                            port_input = true;
                        }
                        Some(Token::Output) => {
                            line.next();
                            port_id = line.integer()?;
                            port_output = true;
                        }
                        Some(Token::Inout) => {
                            line.next();
                            port_id = line.integer()?;
                            port_input = true;
                            port_output = true;
                        }
                        _ => break,
                    }
                }
                let name = line.ident()?;
                line.done()?;
                let mut wire = Wire::new(name, width);
                wire.port_id = port_id;
                wire.port_input = port_input;
                wire.port_output = port_output;
                wire.attributes = std::mem::take(&mut self.pending_attributes);
                module.add_wire(wire)?;
            }
            Token::Memory => {
                let module =
                    self.module.as_mut().ok_or_else(|| line.error("memory outside module"))?;
                let mut width = 1;
                let mut size = 0;
                loop {
                    match line.peek() {
                        Some(Token::Width) => {
                            line.next();
                            width = line.integer()?;
                        }
                        Some(Token::Size) => {
                            line.next();
                            size = line.integer()?;
                        }
                        _ => break,
                    }
                }
                let name = line.ident()?;
                line.done()?;
                let memory = Memory {
                    name: name.clone(),
                    width,
                    size,
                    attributes: std::mem::take(&mut self.pending_attributes),
                };
                module.memories.insert(name, memory);
            }
            Token::Parameter => {
                let signed = line.eat(&Token::Signed);
                let name = line.ident()?;
                if let Some(cell) = self.cell.as_mut() {
                    let value = line.constant()?;
                    line.done()?;
                    cell.parameters.insert(name.clone(), value);
                    if signed {
                        cell.signed_parameters.insert(name);
                    }
                } else if let Some(module) = self.module.as_mut() {
                    let value = if line.peek().is_some() {
                        line.constant()?
                    } else {
                        Const::empty()
                    };
                    line.done()?;
                    module.parameter_defaults.insert(name, value);
                } else {
                    return Err(line.error("parameter outside module"));
                }
            }
            Token::Cell => {
                if self.cell.is_some() || self.process.is_some() {
                    return Err(line.error("unexpected `cell`"));
                }
                if self.module.is_none() {
                    return Err(line.error("cell outside module"));
                }
                let ty = line.ident()?;
                let name = line.ident()?;
                line.done()?;
                let mut cell = Cell::new(name, ty);
                cell.attributes = std::mem::take(&mut self.pending_attributes);
                self.cell = Some(cell);
            }
            Token::Connect => {
                let module =
                    self.module.as_ref().ok_or_else(|| line.error("connect outside module"))?;
                if self.cell.is_some() {
                    let port = line.ident()?;
                    let sig = line.sigspec(module)?;
                    line.done()?;
                    if let Some(cell) = self.cell.as_mut() {
                        cell.connections.insert(port, sig);
                    }
                } else {
                    let lhs = line.sigspec(module)?;
                    let rhs = line.sigspec(module)?;
                    line.done()?;
                    if let Some(module) = self.module.as_mut() {
                        module.connections.push((lhs, rhs));
                    }
                }
            }
            Token::Process => {
                if self.cell.is_some() || self.process.is_some() {
                    return Err(line.error("unexpected `process`"));
                }
                if self.module.is_none() {
                    return Err(line.error("process outside module"));
                }
                let name = line.ident()?;
                line.done()?;
                self.process = Some(Process {
                    name,
                    assigns: Vec::new(),
                    syncs: Vec::new(),
                    attributes: std::mem::take(&mut self.pending_attributes),
                });
            }
            Token::Assign => {
                let module =
                    self.module.as_ref().ok_or_else(|| line.error("assign outside module"))?;
                let lhs = line.sigspec(module)?;
                let rhs = line.sigspec(module)?;
                line.done()?;
                let process =
                    self.process.as_mut().ok_or_else(|| line.error("assign outside process"))?;
                process.assigns.push((lhs, rhs));
            }
            Token::Sync => {
                let module =
                    self.module.as_ref().ok_or_else(|| line.error("sync outside module"))?;
                let edge = match line.next() {
                    Some(Token::Posedge) => SyncEdge::Posedge,
                    Some(Token::Negedge) => SyncEdge::Negedge,
                    _ => return Err(line.error("expected `posedge` or `negedge`")),
                };
                let signal = line.sigspec(module)?;
                line.done()?;
                let process =
                    self.process.as_mut().ok_or_else(|| line.error("sync outside process"))?;
                process.syncs.push(SyncRule { edge, signal, updates: Vec::new() });
            }
            Token::Update => {
                let module =
                    self.module.as_ref().ok_or_else(|| line.error("update outside module"))?;
                let lhs = line.sigspec(module)?;
                let rhs = line.sigspec(module)?;
                line.done()?;
                let sync = self
                    .process
                    .as_mut()
                    .and_then(|p| p.syncs.last_mut())
                    .ok_or_else(|| line.error("update outside sync rule"))?;
                sync.updates.push((lhs, rhs));
            }
            Token::End => {
                line.done()?;
                if let Some(cell) = self.cell.take() {
                    match self.module.as_mut() {
                        Some(module) => module.add_cell(cell)?,
                        None => return Err(line.error("unmatched `end`")),
                    }
                } else if let Some(process) = self.process.take() {
                    match self.module.as_mut() {
                        Some(module) => {
                            module.processes.insert(process.name.clone(), process);
                        }
                        None => return Err(line.error("unmatched `end`")),
                    }
                } else if let Some(module) = self.module.take() {
                    self.design.add_module(module)?;
                } else {
                    return Err(line.error("unmatched `end`"));
                }
            }
            _ => return Err(line.error("unexpected statement")),
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        if self.module.is_some() {
            return Err(FrontendError::parse(self.file, 0, "unterminated module"));
        }
        Ok(())
    }
}
