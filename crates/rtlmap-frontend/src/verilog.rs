//! Structural Verilog reader
//!
//! Supports the subset map libraries and structural designs are written
//! in: module headers (ANSI or non-ANSI ports), `wire`/`input`/`output`
//! declarations with `[N:0]` ranges, `parameter` declarations, module
//! instances with named or positional connections and `#(...)` parameter
//! overrides, `(* ... *)` attributes, and `assign` with bitwise
//! expressions. Expressions lower directly to `$not`/`$and`/`$or`/`$xor`/
//! `$mux` cells.
//!
//! Escaped identifiers (`\$and `) are kept verbatim, which is how map
//! libraries name templates after internal cell types.

use crate::error::{FrontendError, Result};
use logos::Logos;
use rtlmap_netlist::{
    Attributes, Cell, Const, Design, IdString, Module, SigSpec, State, Wire,
};
use tracing::debug;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
enum Token {
    #[token("module")]
    Module,
    #[token("endmodule")]
    Endmodule,
    #[token("input")]
    Input,
    #[token("output")]
    Output,
    #[token("inout")]
    Inout,
    #[token("wire")]
    Wire,
    #[token("assign")]
    Assign,
    #[token("parameter")]
    Parameter,
    #[token("(*")]
    AttrBegin,
    #[token("*)")]
    AttrEnd,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("=")]
    Eq,
    #[token("#")]
    Hash,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[regex(r"[A-Za-z_][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r"\\[^ \t\r\n]+", |lex| lex.slice().to_string())]
    EscIdent(String),
    #[regex(r"[0-9][0-9_]*'[bodhBODH][0-9a-fA-FxzXZ_]+", |lex| lex.slice().to_string())]
    SizedNumber(String),
    #[regex(r"[0-9][0-9_]*", |lex| lex.slice().to_string())]
    Number(String),
    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); s[1..s.len() - 1].to_string() })]
    Str(String),
}

/// Parse structural Verilog and merge the modules into `design`.
pub fn parse(design: &mut Design, text: &str, filename: &str) -> Result<()> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(text);
    while let Some(item) = lexer.next() {
        let line = text[..lexer.span().start].matches('\n').count() + 1;
        match item {
            Ok(token) => tokens.push((token, line)),
            Err(()) => return Err(FrontendError::parse(filename, line, "unrecognized token")),
        }
    }
    let mut parser = Parser { design, file: filename, tokens, pos: 0 };
    while parser.peek().is_some() {
        let attributes = parser.attributes()?;
        parser.expect(&Token::Module, "expected `module`")?;
        parser.module(attributes)?;
    }
    Ok(())
}

struct Parser<'a> {
    design: &'a mut Design,
    file: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

/// Per-module parsing state: the module under construction plus the name
/// counter for cells synthesized from expressions.
struct ModuleBuilder {
    module: Module,
    port_order: Vec<IdString>,
    auto_index: usize,
}

impl<'a> Parser<'a> {
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map(|(_, line)| *line)
            .unwrap_or(0)
    }

    fn error(&self, message: impl Into<String>) -> FrontendError {
        FrontendError::parse(self.file, self.line(), message)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
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

    fn expect(&mut self, token: &Token, message: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    /// An identifier, escaped into user scope. Escaped identifiers keep
    /// their text, so `\$and` names the id `\$and`.
    fn ident(&mut self) -> Result<IdString> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(IdString::escape(&name)),
            Some(Token::EscIdent(name)) => Ok(IdString::new(name)),
            _ => Err(self.error("expected identifier")),
        }
    }

    /// Zero or more `(* ... *)` blocks.
    fn attributes(&mut self) -> Result<Attributes> {
        let mut attributes = Attributes::new();
        while self.eat(&Token::AttrBegin) {
            loop {
                let name = self.ident()?;
                let value = if self.eat(&Token::Eq) {
                    self.const_value()?
                } else {
                    Const::from_u64(1, 1)
                };
                attributes.insert(name, value);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::AttrEnd, "expected `*)`")?;
        }
        Ok(attributes)
    }

    /// A literal constant: number, sized number, or string.
    fn const_value(&mut self) -> Result<Const> {
        match self.next() {
            Some(Token::Number(text)) => {
                let value: u64 =
                    text.replace('_', "").parse().map_err(|_| self.error("bad number"))?;
                Ok(Const::from_u64(value, 32))
            }
            Some(Token::SizedNumber(text)) => {
                parse_sized_number(&text).ok_or_else(|| self.error("bad sized constant"))
            }
            Some(Token::Str(text)) => Ok(Const::from_str_value(&text)),
            _ => Err(self.error("expected constant")),
        }
    }

    /// `[hi:lo]` with `lo == 0`; returns the width.
    fn range(&mut self) -> Result<usize> {
        self.expect(&Token::LBracket, "expected `[`")?;
        let hi = self.usize_number()?;
        self.expect(&Token::Colon, "expected `:`")?;
        let lo = self.usize_number()?;
        self.expect(&Token::RBracket, "expected `]`")?;
        if lo != 0 {
            return Err(self.error("only [N:0] ranges are supported"));
        }
        Ok(hi + 1)
    }

    fn usize_number(&mut self) -> Result<usize> {
        match self.next() {
            Some(Token::Number(text)) => {
                text.replace('_', "").parse().map_err(|_| self.error("bad number"))
            }
            _ => Err(self.error("expected number")),
        }
    }

    fn module(&mut self, attributes: Attributes) -> Result<()> {
        let name = self.ident()?;
        let mut builder = ModuleBuilder {
            module: Module::new(name),
            port_order: Vec::new(),
            auto_index: 0,
        };
        builder.module.attributes = attributes;

        if self.eat(&Token::LParen) {
            if !self.eat(&Token::RParen) {
                loop {
                    self.port_header_entry(&mut builder)?;
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RParen, "expected `)`")?;
            }
        }
        self.expect(&Token::Semi, "expected `;`")?;

        loop {
            let attributes = self.attributes()?;
            match self.peek() {
                Some(Token::Endmodule) => {
                    self.next();
                    break;
                }
                Some(Token::Input) | Some(Token::Output) | Some(Token::Inout)
                | Some(Token::Wire) => {
                    self.declaration(&mut builder, attributes)?;
                }
                Some(Token::Parameter) => {
                    self.parameter(&mut builder)?;
                    if !attributes.is_empty() {
                        debug!("dropping attributes on parameter declaration");
                    }
                }
                Some(Token::Assign) => {
                    self.next();
                    self.assign(&mut builder)?;
                    if !attributes.is_empty() {
                        debug!("dropping attributes on assign statement");
                    }
                }
                Some(Token::Ident(_)) | Some(Token::EscIdent(_)) => {
                    self.instance(&mut builder, attributes)?;
                }
                _ => return Err(self.error("expected module item")),
            }
        }

        // Assign port indices in header order.
        for (index, name) in builder.port_order.iter().enumerate() {
            let wire = builder
                .module
                .wire_mut(name)
                .ok_or_else(|| self.error(format!("port `{}` is not declared", name)))?;
            if !wire.port_input && !wire.port_output {
                return Err(self.error(format!("port `{}` has no direction", name)));
            }
            wire.port_id = index + 1;
        }

        self.design.add_module(builder.module)?;
        Ok(())
    }

    /// One entry of the module header: a bare name, or an ANSI-style
    /// `direction [range] name` declaration.
    fn port_header_entry(&mut self, builder: &mut ModuleBuilder) -> Result<()> {
        let direction = match self.peek() {
            Some(Token::Input) => Some((true, false)),
            Some(Token::Output) => Some((false, true)),
            Some(Token::Inout) => Some((true, true)),
            _ => None,
        };
        if let Some((port_input, port_output)) = direction {
            self.next();
            self.eat(&Token::Wire);
            let width = if self.peek() == Some(&Token::LBracket) { self.range()? } else { 1 };
            let name = self.ident()?;
            let mut wire = Wire::new(name.clone(), width);
            wire.port_input = port_input;
            wire.port_output = port_output;
            builder.module.add_wire(wire)?;
            builder.port_order.push(name);
        } else {
            let name = self.ident()?;
            builder.port_order.push(name);
        }
        Ok(())
    }

    /// `input|output|inout|wire [range] name, name, ... ;`
    fn declaration(&mut self, builder: &mut ModuleBuilder, attributes: Attributes) -> Result<()> {
        let (port_input, port_output) = match self.next() {
            Some(Token::Input) => (true, false),
            Some(Token::Output) => (false, true),
            Some(Token::Inout) => (true, true),
            Some(Token::Wire) => (false, false),
            _ => unreachable!("caller checked the keyword"),
        };
        if port_input || port_output {
            // Tolerate `output wire y;`.
            self.eat(&Token::Wire);
        }
        let width = if self.peek() == Some(&Token::LBracket) { self.range()? } else { 1 };
        loop {
            let name = self.ident()?;
            match builder.module.wire_mut(&name) {
                Some(wire) => {
                    // Merging a direction into an earlier `wire` declaration.
                    if wire.width != width {
                        return Err(self.error(format!(
                            "conflicting widths for `{}` ({} vs {})",
                            name, wire.width, width
                        )));
                    }
                    wire.port_input |= port_input;
                    wire.port_output |= port_output;
                    for (key, value) in &attributes {
                        wire.attributes.insert(key.clone(), value.clone());
                    }
                }
                None => {
                    let mut wire = Wire::new(name.clone(), width);
                    wire.port_input = port_input;
                    wire.port_output = port_output;
                    wire.attributes = attributes.clone();
                    builder.module.add_wire(wire)?;
                }
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::Semi, "expected `;`")?;
        Ok(())
    }

    /// `parameter NAME = value ;`
    fn parameter(&mut self, builder: &mut ModuleBuilder) -> Result<()> {
        self.expect(&Token::Parameter, "expected `parameter`")?;
        let name = self.ident()?;
        self.expect(&Token::Eq, "expected `=`")?;
        let value = self.const_value()?;
        self.expect(&Token::Semi, "expected `;`")?;
        builder.module.parameter_defaults.insert(name, value);
        Ok(())
    }

    /// `assign lvalue = expr ;`
    fn assign(&mut self, builder: &mut ModuleBuilder) -> Result<()> {
        let lhs = self.lvalue(builder)?;
        self.expect(&Token::Eq, "expected `=`")?;
        let mut rhs = self.expr(builder)?;
        self.expect(&Token::Semi, "expected `;`")?;
        // Adjust the driver to the target width.
        if rhs.width() > lhs.width() {
            rhs.remove(lhs.width(), rhs.width() - lhs.width());
        } else if rhs.width() < lhs.width() {
            rhs.append(SigSpec::from(Const::repeat(State::S0, lhs.width() - rhs.width())));
        }
        builder.module.connections.push((lhs, rhs));
        Ok(())
    }

    /// `TYPE #(.P(v), ...) name ( connections ) ;`
    fn instance(&mut self, builder: &mut ModuleBuilder, attributes: Attributes) -> Result<()> {
        let ty = self.ident()?;
        let mut parameters = indexmap::IndexMap::new();

        if self.eat(&Token::Hash) {
            self.expect(&Token::LParen, "expected `(`")?;
            loop {
                self.expect(&Token::Dot, "expected `.`")?;
                let param = self.ident()?;
                self.expect(&Token::LParen, "expected `(`")?;
                let value = self.const_value()?;
                self.expect(&Token::RParen, "expected `)`")?;
                parameters.insert(param, value);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen, "expected `)`")?;
        }

        let name = self.ident()?;
        let mut cell = Cell::new(name, ty);
        cell.parameters = parameters;
        cell.attributes = attributes;
        self.expect(&Token::LParen, "expected `(`")?;
        if !self.eat(&Token::RParen) {
            if self.peek() == Some(&Token::Dot) {
                loop {
                    self.expect(&Token::Dot, "expected `.`")?;
                    let port = self.ident()?;
                    self.expect(&Token::LParen, "expected `(`")?;
                    if self.peek() == Some(&Token::RParen) {
                        // `.A()` leaves the port unconnected.
                        self.next();
                    } else {
                        let sig = self.expr(builder)?;
                        self.expect(&Token::RParen, "expected `)`")?;
                        cell.connections.insert(port, sig);
                    }
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
            } else {
                let mut index = 0;
                loop {
                    index += 1;
                    let sig = self.expr(builder)?;
                    cell.connections.insert(IdString::new(format!("${}", index)), sig);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
            }
            self.expect(&Token::RParen, "expected `)`")?;
        }
        self.expect(&Token::Semi, "expected `;`")?;
        builder.module.add_cell(cell)?;
        Ok(())
    }

    /// An assignment target: identifier, slice, or concatenation.
    fn lvalue(&mut self, builder: &mut ModuleBuilder) -> Result<SigSpec> {
        if self.eat(&Token::LBrace) {
            let mut parts = Vec::new();
            loop {
                parts.push(self.lvalue(builder)?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RBrace, "expected `}`")?;
            let mut sig = SigSpec::empty();
            for part in parts.into_iter().rev() {
                sig.append(part);
            }
            Ok(sig)
        } else {
            let name = self.ident()?;
            self.wire_ref(builder, name)
        }
    }

    fn wire_ref(&mut self, builder: &ModuleBuilder, name: IdString) -> Result<SigSpec> {
        let wire = builder
            .module
            .wire(&name)
            .ok_or_else(|| self.error(format!("reference to undeclared wire `{}`", name)))?;
        let full_width = wire.width;
        if self.peek() == Some(&Token::LBracket) {
            self.next();
            let first = self.usize_number()?;
            let (offset, width) = if self.eat(&Token::Colon) {
                let lo = self.usize_number()?;
                if first < lo {
                    return Err(self.error("slice bounds are [msb:lsb]"));
                }
                (lo, first - lo + 1)
            } else {
                (first, 1)
            };
            self.expect(&Token::RBracket, "expected `]`")?;
            if offset + width > full_width {
                return Err(self.error(format!("slice out of bounds for `{}`", name)));
            }
            Ok(SigSpec::wire_slice(name, offset, width))
        } else {
            Ok(SigSpec::wire(name, full_width))
        }
    }

    // Expression grammar, lowest precedence first:
    //   expr    := or ('?' expr ':' expr)?
    //   or      := xor ('|' xor)*
    //   xor     := and ('^' and)*
    //   and     := unary ('&' unary)*
    //   unary   := '~' unary | primary
    fn expr(&mut self, builder: &mut ModuleBuilder) -> Result<SigSpec> {
        let cond = self.or_expr(builder)?;
        if self.eat(&Token::Question) {
            let then_sig = self.expr(builder)?;
            self.expect(&Token::Colon, "expected `:`")?;
            let else_sig = self.expr(builder)?;
            if cond.width() != 1 {
                return Err(self.error("mux condition must be a single bit"));
            }
            return make_mux(builder, cond, then_sig, else_sig);
        }
        Ok(cond)
    }

    fn or_expr(&mut self, builder: &mut ModuleBuilder) -> Result<SigSpec> {
        let mut lhs = self.xor_expr(builder)?;
        while self.eat(&Token::Pipe) {
            let rhs = self.xor_expr(builder)?;
            lhs = make_binary(builder, "$or", lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn xor_expr(&mut self, builder: &mut ModuleBuilder) -> Result<SigSpec> {
        let mut lhs = self.and_expr(builder)?;
        while self.eat(&Token::Caret) {
            let rhs = self.and_expr(builder)?;
            lhs = make_binary(builder, "$xor", lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn and_expr(&mut self, builder: &mut ModuleBuilder) -> Result<SigSpec> {
        let mut lhs = self.unary_expr(builder)?;
        while self.eat(&Token::Amp) {
            let rhs = self.unary_expr(builder)?;
            lhs = make_binary(builder, "$and", lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary_expr(&mut self, builder: &mut ModuleBuilder) -> Result<SigSpec> {
        if self.eat(&Token::Tilde) {
            let arg = self.unary_expr(builder)?;
            return make_not(builder, arg);
        }
        self.primary(builder)
    }

    fn primary(&mut self, builder: &mut ModuleBuilder) -> Result<SigSpec> {
        match self.peek().cloned() {
            Some(Token::LParen) => {
                self.next();
                let sig = self.expr(builder)?;
                self.expect(&Token::RParen, "expected `)`")?;
                Ok(sig)
            }
            Some(Token::LBrace) => {
                self.next();
                let mut parts = Vec::new();
                loop {
                    parts.push(self.expr(builder)?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RBrace, "expected `}`")?;
                let mut sig = SigSpec::empty();
                for part in parts.into_iter().rev() {
                    sig.append(part);
                }
                Ok(sig)
            }
            Some(Token::Number(_)) | Some(Token::SizedNumber(_)) | Some(Token::Str(_)) => {
                Ok(SigSpec::from(self.const_value()?))
            }
            Some(Token::Ident(_)) | Some(Token::EscIdent(_)) => {
                let name = self.ident()?;
                self.wire_ref(builder, name)
            }
            _ => Err(self.error("expected expression")),
        }
    }
}

fn zero_extend(sig: &mut SigSpec, width: usize) {
    if sig.width() < width {
        sig.append(SigSpec::from(Const::repeat(State::S0, width - sig.width())));
    }
}

/// Create the output wire and cell shell for a synthesized operator.
fn auto_cell(builder: &mut ModuleBuilder, op: &str, width: usize) -> Result<(Cell, SigSpec)> {
    builder.auto_index += 1;
    let cell_name = IdString::new(format!("{}${}", op, builder.auto_index));
    let wire_name = IdString::new(format!("{}${}_Y", op, builder.auto_index));
    let wire = Wire::new(wire_name, width);
    let sig = wire.sig();
    builder.module.add_wire(wire)?;
    Ok((Cell::new(cell_name, op), sig))
}

fn make_binary(
    builder: &mut ModuleBuilder,
    op: &str,
    mut a: SigSpec,
    mut b: SigSpec,
) -> Result<SigSpec> {
    let width = a.width().max(b.width());
    zero_extend(&mut a, width);
    zero_extend(&mut b, width);
    let (mut cell, y) = auto_cell(builder, op, width)?;
    cell.parameters.insert(IdString::new("\\A_SIGNED"), Const::from_u64(0, 1));
    cell.parameters.insert(IdString::new("\\B_SIGNED"), Const::from_u64(0, 1));
    cell.parameters.insert(IdString::new("\\A_WIDTH"), Const::from_u64(width as u64, 32));
    cell.parameters.insert(IdString::new("\\B_WIDTH"), Const::from_u64(width as u64, 32));
    cell.parameters.insert(IdString::new("\\Y_WIDTH"), Const::from_u64(width as u64, 32));
    cell.connections.insert(IdString::new("\\A"), a);
    cell.connections.insert(IdString::new("\\B"), b);
    cell.connections.insert(IdString::new("\\Y"), y.clone());
    builder.module.add_cell(cell)?;
    Ok(y)
}

fn make_not(builder: &mut ModuleBuilder, a: SigSpec) -> Result<SigSpec> {
    let width = a.width();
    let (mut cell, y) = auto_cell(builder, "$not", width)?;
    cell.parameters.insert(IdString::new("\\A_SIGNED"), Const::from_u64(0, 1));
    cell.parameters.insert(IdString::new("\\A_WIDTH"), Const::from_u64(width as u64, 32));
    cell.parameters.insert(IdString::new("\\Y_WIDTH"), Const::from_u64(width as u64, 32));
    cell.connections.insert(IdString::new("\\A"), a);
    cell.connections.insert(IdString::new("\\Y"), y.clone());
    builder.module.add_cell(cell)?;
    Ok(y)
}

fn make_mux(
    builder: &mut ModuleBuilder,
    cond: SigSpec,
    mut then_sig: SigSpec,
    mut else_sig: SigSpec,
) -> Result<SigSpec> {
    let width = then_sig.width().max(else_sig.width());
    zero_extend(&mut then_sig, width);
    zero_extend(&mut else_sig, width);
    let (mut cell, y) = auto_cell(builder, "$mux", width)?;
    cell.parameters.insert(IdString::new("\\WIDTH"), Const::from_u64(width as u64, 32));
    cell.connections.insert(IdString::new("\\A"), else_sig);
    cell.connections.insert(IdString::new("\\B"), then_sig);
    cell.connections.insert(IdString::new("\\S"), cond);
    cell.connections.insert(IdString::new("\\Y"), y.clone());
    builder.module.add_cell(cell)?;
    Ok(y)
}

/// Parse a `width'base digits` literal.
fn parse_sized_number(text: &str) -> Option<Const> {
    let (width_text, rest) = text.split_once('\'')?;
    let width: usize = width_text.replace('_', "").parse().ok()?;
    let base = rest.chars().next()?;
    let digits: String = rest[1..].replace('_', "");
    let mut bits: Vec<State> = Vec::new();
    match base.to_ascii_lowercase() {
        'b' => {
            for c in digits.chars().rev() {
                bits.push(State::from_char(c.to_ascii_lowercase())?);
            }
        }
        'o' => {
            for c in digits.chars().rev() {
                push_digit_bits(&mut bits, c, 3)?;
            }
        }
        'h' => {
            for c in digits.chars().rev() {
                push_digit_bits(&mut bits, c, 4)?;
            }
        }
        'd' => {
            let value: u64 = digits.parse().ok()?;
            bits = Const::from_u64(value, width).bits;
        }
        _ => return None,
    }
    bits.resize(width, State::S0);
    Some(Const::from_bits(bits))
}

fn push_digit_bits(bits: &mut Vec<State>, digit: char, count: usize) -> Option<()> {
    let digit = digit.to_ascii_lowercase();
    match digit {
        'x' => bits.extend(std::iter::repeat(State::Sx).take(count)),
        'z' => bits.extend(std::iter::repeat(State::Sz).take(count)),
        _ => {
            let value = digit.to_digit(16)? as usize;
            if value >= (1 << count) {
                return None;
            }
            for i in 0..count {
                bits.push(if (value >> i) & 1 == 1 { State::S1 } else { State::S0 });
            }
        }
    }
    Some(())
}
