// Copyright (c) 2026 MCU-Debug Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed evaluation of parsed expressions against a live (or dummy) target.
//!
//! Sub-expressions evaluate to an [`Operand`]: either a place in target memory
//! with its type, or an already loaded [`Value`]. Places are only read when a
//! scalar is needed, so `&x`, `a[i]` and `s.f` compute addresses without any
//! target traffic, and a whole array or struct is never loaded.

use std::fmt;

use log::trace;

use crate::arch::Arch;
use crate::debuginfo::{BaseKind, DebugFunction, DebugInfo, Scope, Storage, TypeKind, TypeRef};
use crate::driver::DebugDriver;
use crate::error::{DebuggerError, Result, SymbolError};
use crate::expr::{BinaryOp, Expr, UnaryOp};

/// A materialized result. Only scalars and pointers exist as values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Pointer { address: u64, pointee: TypeRef },
    Str(String),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Pointer { .. } => "pointer",
            Value::Str(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Pointer { address, pointee } => write!(f, "({}*) 0x{:x}", pointee, address),
            Value::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Place { address: u64, ty: TypeRef },
    Value(Value),
}

/// The frame that locals are resolved in.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub function: &'a DebugFunction,
    pub base: u64,
}

pub struct Evaluator<'a> {
    info: &'a DebugInfo,
    arch: &'a Arch,
    frame: Option<Frame<'a>>,
    target: &'a mut dyn DebugDriver,
}

fn mismatch(op: impl fmt::Display, left: &Value, right: &Value) -> SymbolError {
    SymbolError::TypeMismatch(format!(
        "cannot apply '{}' to {} and {}",
        op,
        left.kind(),
        right.kind()
    ))
}

impl<'a> Evaluator<'a> {
    pub fn new(info: &'a DebugInfo, arch: &'a Arch, target: &'a mut dyn DebugDriver) -> Self {
        Self {
            info,
            arch,
            frame: None,
            target,
        }
    }

    /// Resolve locals of `frame.function`, shadowing globals of the same name.
    pub fn with_frame(mut self, frame: Option<Frame<'a>>) -> Self {
        self.frame = frame;
        self
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        let operand = self.operand(expr)?;
        self.load(operand, expr)
    }

    fn operand(&mut self, expr: &Expr) -> Result<Operand> {
        match expr {
            Expr::Int(v) => Ok(Operand::Value(Value::Int(*v))),
            Expr::Float(v) => Ok(Operand::Value(Value::Float(*v))),
            Expr::String(s) => Ok(Operand::Value(Value::Str(s.clone()))),
            Expr::Variable(name) => self.variable(name),
            Expr::Unary { op, operand } => self.unary(*op, operand),
            Expr::Binary { left, op, right } => {
                let lhs = self.evaluate(left)?;
                let rhs = self.evaluate(right)?;
                Ok(Operand::Value(self.binary(*op, lhs, rhs)?))
            }
            Expr::Index(base, index) => self.index(base, index),
            Expr::Member(base, field) => self.member(base, field),
        }
    }

    fn variable(&mut self, name: &str) -> Result<Operand> {
        let local = self.frame.and_then(|frame| {
            self.info
                .variable_named(Scope::Function(frame.function), name)
                .map(|var| (var, Some(frame.base)))
        });
        let (var, base) = match local {
            Some(found) => found,
            None => self
                .info
                .variable_named(Scope::Global, name)
                .map(|var| (var, None))
                .ok_or_else(|| SymbolError::UndefinedSymbol(name.to_string()))?,
        };
        let address = match (&var.storage, base) {
            (Storage::Global(addr), _) => self
                .info
                .absolute_address(addr)
                .ok_or_else(|| SymbolError::UndefinedSymbol(name.to_string()))?,
            (Storage::Frame(offset), Some(base)) => base.wrapping_add_signed(*offset),
            // frame storage is rejected for globals when the debug info is built
            (Storage::Frame(_), None) => return Err(SymbolError::UndefinedSymbol(name.to_string()).into()),
        };
        trace!("{} lives at 0x{:x}", name, address);
        Ok(Operand::Place {
            address,
            ty: var.ty.clone(),
        })
    }

    /// Read a place as a scalar or pointer value.
    fn load(&mut self, operand: Operand, expr: &Expr) -> Result<Value> {
        let (address, ty) = match operand {
            Operand::Value(v) => return Ok(v),
            Operand::Place { address, ty } => (address, ty),
        };
        let def = self.info.type_named(&ty)?;
        match &def.kind {
            TypeKind::Array { .. } | TypeKind::Struct { .. } => {
                Err(SymbolError::AggregateValue(expr.to_string()).into())
            }
            TypeKind::Pointer { pointee } => {
                let pointee = pointee.clone();
                let width = scalar_width(BaseKind::UnsignedInt, u64::from(self.info.address_size()))?;
                let raw = self.read_scalar(address, width)?;
                Ok(Value::Pointer {
                    address: raw,
                    pointee,
                })
            }
            TypeKind::Base { encoding, size } => {
                let encoding = *encoding;
                let width = scalar_width(encoding, *size)?;
                let raw = self.read_scalar(address, width)?;
                Ok(decode_base(encoding, width, raw))
            }
        }
    }

    fn read_scalar(&mut self, address: u64, width: usize) -> Result<u64> {
        let bytes = self.target.read_memory(address, width)?;
        Ok(self.arch.decode_value(&bytes))
    }

    fn unary(&mut self, op: UnaryOp, inner: &Expr) -> Result<Operand> {
        let operand = self.operand(inner)?;
        let value = match op {
            UnaryOp::AddressOf => match operand {
                Operand::Place { address, ty } => Value::Pointer {
                    address,
                    pointee: ty,
                },
                Operand::Value(_) => return Err(SymbolError::NotAddressable(inner.to_string()).into()),
            },
            UnaryOp::Deref => match self.load(operand, inner)? {
                Value::Pointer { address, pointee } => {
                    return Ok(Operand::Place {
                        address,
                        ty: pointee,
                    })
                }
                _ => return Err(SymbolError::NotAPointer(inner.to_string()).into()),
            },
            UnaryOp::Plus => match self.load(operand, inner)? {
                Value::Str(_) => {
                    return Err(SymbolError::TypeMismatch(format!("cannot apply unary '+' to string {}", inner)).into())
                }
                v => v,
            },
            UnaryOp::Negate => match self.load(operand, inner)? {
                Value::Int(v) => Value::Int(v.wrapping_neg()),
                Value::Float(v) => Value::Float(-v),
                Value::Pointer { address, .. } => Value::Int((address as i64).wrapping_neg()),
                Value::Str(_) => {
                    return Err(SymbolError::TypeMismatch(format!("cannot negate string {}", inner)).into())
                }
            },
        };
        Ok(Operand::Value(value))
    }

    fn binary(&self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
        use Value::*;
        let value = match (op, &lhs, &rhs) {
            (BinaryOp::Add, Int(a), Int(b)) => Int(a.wrapping_add(*b)),
            (BinaryOp::Subtract, Int(a), Int(b)) => Int(a.wrapping_sub(*b)),
            (BinaryOp::Multiply, Int(a), Int(b)) => Int(a.wrapping_mul(*b)),
            (_, Int(_) | Float(_), Int(_) | Float(_)) => {
                let (a, b) = (as_float(&lhs), as_float(&rhs));
                Float(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                })
            }
            (BinaryOp::Add, Pointer { address, pointee }, Int(n))
            | (BinaryOp::Add, Int(n), Pointer { address, pointee }) => Pointer {
                address: self.offset_pointer(*address, pointee, *n)?,
                pointee: pointee.clone(),
            },
            (BinaryOp::Subtract, Pointer { address, pointee }, Int(n)) => Pointer {
                address: self.offset_pointer(*address, pointee, n.wrapping_neg())?,
                pointee: pointee.clone(),
            },
            (
                BinaryOp::Subtract,
                Pointer { address: a, pointee },
                Pointer { address: b, pointee: other },
            ) if pointee == other => {
                let stride = self.info.size_of(pointee)?.max(1) as i64;
                Int((a.wrapping_sub(*b) as i64) / stride)
            }
            _ => return Err(mismatch(op, &lhs, &rhs).into()),
        };
        Ok(value)
    }

    fn offset_pointer(&self, address: u64, pointee: &TypeRef, count: i64) -> Result<u64> {
        let stride = self.info.size_of(pointee)? as i64;
        Ok(address.wrapping_add_signed(count.wrapping_mul(stride)))
    }

    fn index(&mut self, base: &Expr, index: &Expr) -> Result<Operand> {
        let position = match self.evaluate(index)? {
            Value::Int(i) => i,
            other => {
                return Err(SymbolError::TypeMismatch(format!(
                    "array index {} is a {}, not an integer",
                    index,
                    other.kind()
                ))
                .into())
            }
        };
        let operand = self.operand(base)?;
        if let Operand::Place { address, ty } = &operand {
            if let TypeKind::Array { element, .. } = &self.info.type_named(ty)?.kind {
                let element = element.clone();
                return Ok(Operand::Place {
                    address: self.offset_pointer(*address, &element, position)?,
                    ty: element,
                });
            }
        }
        match self.load(operand, base) {
            Ok(Value::Pointer { address, pointee }) => Ok(Operand::Place {
                address: self.offset_pointer(address, &pointee, position)?,
                ty: pointee,
            }),
            Ok(_) | Err(DebuggerError::Symbol(SymbolError::AggregateValue(_))) => {
                Err(SymbolError::NotIndexable(base.to_string()).into())
            }
            Err(err) => Err(err),
        }
    }

    fn member(&mut self, base: &Expr, field: &str) -> Result<Operand> {
        let (address, ty) = match self.operand(base)? {
            Operand::Place { address, ty } => (address, ty),
            Operand::Value(_) => return Err(SymbolError::NotAStruct(base.to_string()).into()),
        };
        let def = self.info.type_named(&ty)?;
        if !matches!(def.kind, TypeKind::Struct { .. }) {
            return Err(SymbolError::NotAStruct(base.to_string()).into());
        }
        let member = def.field(field).ok_or_else(|| SymbolError::NoSuchField {
            field: field.to_string(),
            ty: def.name.clone(),
        })?;
        Ok(Operand::Place {
            address: address.wrapping_add(member.offset),
            ty: member.ty.clone(),
        })
    }
}

fn as_float(value: &Value) -> f64 {
    match value {
        Value::Int(v) => *v as f64,
        Value::Float(v) => *v,
        _ => f64::NAN,
    }
}

/// Byte width of a scalar the evaluator can decode. Floats are IEEE single or
/// double; integers fit in 64 bits.
fn scalar_width(encoding: BaseKind, size: u64) -> Result<usize, SymbolError> {
    match (encoding, size) {
        (BaseKind::Float, 4 | 8) => Ok(size as usize),
        (BaseKind::Float, _) => Err(SymbolError::TypeMismatch(format!(
            "{}-byte floating point values are not supported",
            size
        ))),
        (_, 1..=8) => Ok(size as usize),
        _ => Err(SymbolError::TypeMismatch(format!(
            "{}-byte scalars are not supported",
            size
        ))),
    }
}

fn decode_base(encoding: BaseKind, width: usize, raw: u64) -> Value {
    match encoding {
        BaseKind::Float if width == 4 => Value::Float(f64::from(f32::from_bits(raw as u32))),
        BaseKind::Float => Value::Float(f64::from_bits(raw)),
        BaseKind::SignedInt => {
            let bits = (width * 8) as u32;
            let shift = 64 - bits;
            Value::Int(((raw << shift) as i64) >> shift)
        }
        BaseKind::UnsignedInt | BaseKind::Bool | BaseKind::Char => Value::Int(raw as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debuginfo::{DebugAddress, DebugVariable, StructField};
    use crate::dummy::DummyDriver;
    use crate::expr::parse;
    use crate::section::DebugSection;

    fn info() -> DebugInfo {
        let mut b = DebugInfo::builder(4);
        b.add(DebugSection::new("data", 0x1000, 0x100));
        let int = b.base_type("int", BaseKind::SignedInt, 4);
        let short = b.base_type("short", BaseKind::SignedInt, 2);
        let float = b.base_type("float", BaseKind::Float, 4);
        let ints = b.array_of(&int, 4);
        let int_ptr = b.pointer_to(&int);
        let pair = b.struct_type(
            "pair",
            vec![StructField::new("a", int.clone(), 0), StructField::new("b", short.clone(), 4)],
            8,
        );
        b.add(DebugVariable::global("i", int.clone(), DebugAddress::new("data", 0)));
        b.add(DebugVariable::global("s", short, DebugAddress::new("data", 4)));
        b.add(DebugVariable::global("f", float, DebugAddress::new("data", 8)));
        b.add(DebugVariable::global("arr", ints, DebugAddress::new("data", 0x10)));
        b.add(DebugVariable::global("p", int_ptr, DebugAddress::new("data", 0x20)));
        b.add(DebugVariable::global("pr", pair, DebugAddress::new("data", 0x28)));
        b.build().unwrap()
    }

    fn eval(info: &DebugInfo, target: &mut DummyDriver, src: &str) -> Result<Value> {
        let arch = Arch::arm();
        let expr = parse(src)?;
        Evaluator::new(info, &arch, target).evaluate(&expr)
    }

    fn target() -> DummyDriver {
        let mut t = DummyDriver::new(Arch::arm());
        t.poke_value(0x1000, 7, 4);
        t.poke_value(0x1004, 0xfffe, 2);
        t.poke_value(0x1008, u64::from(2.5f32.to_bits()), 4);
        t.poke_value(0x1018, 30, 4);
        t.poke_value(0x1020, 0x1010, 4);
        t.poke_value(0x102c, 9, 2);
        t
    }

    #[test]
    fn scalars_decode_by_encoding() {
        let info = info();
        let mut t = target();
        assert_eq!(eval(&info, &mut t, "i").unwrap(), Value::Int(7));
        assert_eq!(eval(&info, &mut t, "s").unwrap(), Value::Int(-2));
        assert_eq!(eval(&info, &mut t, "f * 2").unwrap(), Value::Float(5.0));
    }

    #[test]
    fn pointer_arithmetic_scales_by_pointee() {
        let info = info();
        let mut t = target();
        assert_eq!(eval(&info, &mut t, "p[2]").unwrap(), Value::Int(30));
        assert_eq!(eval(&info, &mut t, "*(p + 2)").unwrap(), Value::Int(30));
        assert_eq!(eval(&info, &mut t, "(p + 3) - p").unwrap(), Value::Int(3));
        assert_eq!(eval(&info, &mut t, "*&i").unwrap(), Value::Int(7));
    }

    #[test]
    fn address_of_needs_no_target_read() {
        let info = info();
        let mut t = target();
        let v = eval(&info, &mut t, "&arr[1]").unwrap();
        assert_eq!(
            v,
            Value::Pointer {
                address: 0x1014,
                pointee: TypeRef::new("int")
            }
        );
        assert!(t.calls.is_empty());
    }

    #[test]
    fn struct_fields_resolve_by_offset() {
        let info = info();
        let mut t = target();
        assert_eq!(eval(&info, &mut t, "pr.b + 1").unwrap(), Value::Int(10));
        assert!(matches!(
            eval(&info, &mut t, "pr.z"),
            Err(crate::error::DebuggerError::Symbol(SymbolError::NoSuchField { .. }))
        ));
        assert!(matches!(
            eval(&info, &mut t, "pr"),
            Err(crate::error::DebuggerError::Symbol(SymbolError::AggregateValue(_)))
        ));
    }

    #[test]
    fn oversized_scalars_are_rejected_before_reading() {
        let mut b = DebugInfo::builder(4);
        b.add(DebugSection::new("data", 0x1000, 0x100));
        let half = b.base_type("half", BaseKind::Float, 2);
        let quad = b.base_type("long double", BaseKind::Float, 16);
        let wide = b.base_type("__int128", BaseKind::SignedInt, 16);
        b.add(DebugVariable::global("h", half, DebugAddress::new("data", 0)));
        b.add(DebugVariable::global("q", quad, DebugAddress::new("data", 0x10)));
        b.add(DebugVariable::global("w", wide, DebugAddress::new("data", 0x20)));
        let info = b.build().unwrap();

        let mut t = target();
        for src in ["h", "q", "w"] {
            assert!(matches!(
                eval(&info, &mut t, src),
                Err(crate::error::DebuggerError::Symbol(SymbolError::TypeMismatch(_)))
            ));
        }
        assert!(t.calls.is_empty());
        assert!(eval(&info, &mut t, "&q").is_ok());
    }

    #[test]
    fn invalid_operations_are_rejected() {
        let info = info();
        let mut t = target();
        let symbol = |r: Result<Value>| match r {
            Err(crate::error::DebuggerError::Symbol(e)) => e,
            other => panic!("expected symbol error, got {:?}", other),
        };
        assert!(matches!(symbol(eval(&info, &mut t, "*i")), SymbolError::NotAPointer(_)));
        assert!(matches!(symbol(eval(&info, &mut t, "&3")), SymbolError::NotAddressable(_)));
        assert!(matches!(symbol(eval(&info, &mut t, "i[0]")), SymbolError::NotIndexable(_)));
        assert!(matches!(symbol(eval(&info, &mut t, "i.a")), SymbolError::NotAStruct(_)));
        assert!(matches!(symbol(eval(&info, &mut t, "arr[1.5]")), SymbolError::TypeMismatch(_)));
        assert!(matches!(symbol(eval(&info, &mut t, "p * 2")), SymbolError::TypeMismatch(_)));
        assert!(matches!(symbol(eval(&info, &mut t, "-\"x\"")), SymbolError::TypeMismatch(_)));
    }
}
