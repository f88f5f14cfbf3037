#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use hoare_ast::{base_name, is_generated, Expr, Op, OpClass, QuantKind, Quantifier, Subscript, Value, VarType};
use hoare_core::TypeEnv;
use z3::ast::{self, Array, Ast, Bool, Dynamic, Int};
use z3::{Context, Model, Sort};

use crate::error::{Binding, VerifyError};

fn unsupported(message: impl Into<String>) -> VerifyError {
    VerifyError::Unsupported(message.into())
}

/// Array variable underneath a whole-array term.
fn whole_array_name(e: &Expr) -> Option<&str> {
    match e {
        Expr::Var(name) => Some(name),
        Expr::Store { base, .. } => whole_array_name(base),
        _ => None,
    }
}

/// Contiguous range of an array, read through pending element writes.
struct View<'ctx> {
    array: Array<'ctx>,
    overrides: Vec<(Int<'ctx>, Int<'ctx>)>,
    lower: Int<'ctx>,
    len: Int<'ctx>,
}

/// Translates expressions into Z3 terms over one set of program variables.
///
/// Program variables become constants of their resolved sort. Quantifier
/// variables are bound only while their body is translated. A forked name
/// such as `x#1` that was never declared gets its own constant with the sort
/// of `x`.
pub struct SmtBridge<'ctx> {
    ctx: &'ctx Context,
    vars: BTreeMap<String, (VarType, Dynamic<'ctx>)>,
    bound: Vec<(String, VarType, Dynamic<'ctx>)>,
    array_lengths: BTreeMap<String, i64>,
    offsets: usize,
}

impl<'ctx> SmtBridge<'ctx> {
    pub fn new(ctx: &'ctx Context, env: &TypeEnv, array_lengths: &BTreeMap<String, i64>) -> Self {
        let mut bridge = Self {
            ctx,
            vars: BTreeMap::new(),
            bound: Vec::new(),
            array_lengths: array_lengths.clone(),
            offsets: 0,
        };
        for (name, ty) in env.resolved() {
            bridge.declare(name, ty);
        }
        bridge
    }

    fn constant(&self, name: &str, ty: VarType) -> Dynamic<'ctx> {
        match ty {
            VarType::Int => Dynamic::from_ast(&Int::new_const(self.ctx, name)),
            VarType::Bool => Dynamic::from_ast(&Bool::new_const(self.ctx, name)),
            VarType::Array => Dynamic::from_ast(&Array::new_const(
                self.ctx,
                name,
                &Sort::int(self.ctx),
                &Sort::int(self.ctx),
            )),
        }
    }

    fn declare(&mut self, name: &str, ty: VarType) -> Dynamic<'ctx> {
        let term = self.constant(name, ty);
        self.vars.insert(name.to_string(), (ty, term.clone()));
        term
    }

    fn sort_of(&self, name: &str) -> Option<VarType> {
        self.bound
            .iter()
            .rev()
            .find(|(n, _, _)| n == name)
            .map(|(_, ty, _)| *ty)
            .or_else(|| self.vars.get(name).map(|(ty, _)| *ty))
            .or_else(|| self.vars.get(base_name(name)).map(|(ty, _)| *ty))
    }

    fn lookup(&mut self, name: &str) -> Result<(VarType, Dynamic<'ctx>), VerifyError> {
        if let Some((_, ty, term)) = self.bound.iter().rev().find(|(n, _, _)| n == name) {
            return Ok((*ty, term.clone()));
        }
        if let Some((ty, term)) = self.vars.get(name) {
            return Ok((*ty, term.clone()));
        }
        let Some(ty) = self.vars.get(base_name(name)).map(|(ty, _)| *ty) else {
            return Err(unsupported(format!("no solver term for variable `{name}`")));
        };
        Ok((ty, self.declare(name, ty)))
    }

    fn length_of(&self, name: &str) -> Result<i64, VerifyError> {
        self.array_lengths
            .get(name)
            .or_else(|| self.array_lengths.get(base_name(name)))
            .copied()
            .ok_or_else(|| {
                unsupported(format!(
                    "length of array `{name}` is unknown; supply it in `array_lengths`"
                ))
            })
    }

    fn is_array_valued(&self, e: &Expr) -> bool {
        match e {
            Expr::Subscript(sub) => sub.is_slice(),
            Expr::Store { .. } => true,
            Expr::Var(name) => self.sort_of(name) == Some(VarType::Array),
            _ => false,
        }
    }

    pub fn translate_bool(&mut self, e: &Expr) -> Result<Bool<'ctx>, VerifyError> {
        match e {
            Expr::Lit(Value::Bool(b)) => Ok(Bool::from_bool(self.ctx, *b)),
            Expr::Var(name) => {
                let (ty, term) = self.lookup(name)?;
                term.as_bool()
                    .ok_or_else(|| unsupported(format!("`{name}` has sort {ty}, expected bool")))
            }
            Expr::Unary { op: Op::Not, operand } => Ok(self.translate_bool(operand)?.not()),
            Expr::Binary { left, op, right } if op.class() == OpClass::Bool => {
                let l = self.translate_bool(left)?;
                let r = self.translate_bool(right)?;
                match op {
                    Op::And => Ok(Bool::and(self.ctx, &[&l, &r])),
                    Op::Or => Ok(Bool::or(self.ctx, &[&l, &r])),
                    Op::Implies => Ok(l.implies(&r)),
                    Op::Iff => Ok(l.iff(&r)),
                    other => Err(unsupported(format!("`{other}` is not a binary connective"))),
                }
            }
            Expr::Binary { left, op, right } if op.is_comp() => {
                if self.is_array_valued(left) || self.is_array_valued(right) {
                    return self.translate_array_comparison(left, *op, right);
                }
                let l = self.translate_int(left)?;
                let r = self.translate_int(right)?;
                match op {
                    Op::Eq => Ok(l._eq(&r)),
                    Op::NEq => Ok(l._eq(&r).not()),
                    Op::Lt => Ok(l.lt(&r)),
                    Op::Le => Ok(l.le(&r)),
                    Op::Gt => Ok(l.gt(&r)),
                    Op::Ge => Ok(l.ge(&r)),
                    other => Err(unsupported(format!("`{other}` is not a comparison"))),
                }
            }
            Expr::Quantifier(q) => self.translate_quantifier(q),
            _ => Err(unsupported(format!("`{e}` is not a boolean term"))),
        }
    }

    pub fn translate_int(&mut self, e: &Expr) -> Result<Int<'ctx>, VerifyError> {
        match e {
            Expr::Lit(Value::Int(n)) => Ok(Int::from_i64(self.ctx, *n)),
            Expr::Var(name) => {
                let (ty, term) = self.lookup(name)?;
                term.as_int()
                    .ok_or_else(|| unsupported(format!("`{name}` has sort {ty}, expected int")))
            }
            Expr::Unary { op: Op::Sub, operand } => Ok(self.translate_int(operand)?.unary_minus()),
            Expr::Unary { op: Op::Add, operand } => self.translate_int(operand),
            Expr::Binary { left, op, right } if op.is_arith() => {
                let l = self.translate_int(left)?;
                let r = self.translate_int(right)?;
                match op {
                    Op::Add => Ok(Int::add(self.ctx, &[&l, &r])),
                    Op::Sub => Ok(Int::sub(self.ctx, &[&l, &r])),
                    Op::Mul => Ok(Int::mul(self.ctx, &[&l, &r])),
                    Op::Div => Ok(l.div(&r)),
                    Op::Mod => Ok(l.modulo(&r)),
                    other => Err(unsupported(format!("`{other}` is not arithmetic"))),
                }
            }
            Expr::Subscript(sub) if !sub.is_slice() => {
                let index = self.translate_int(&sub.index)?;
                let array = self.translate_array(&sub.base)?;
                let overrides = self.translate_overrides(sub)?;
                Ok(self.select(&array, &overrides, &index))
            }
            _ => Err(unsupported(format!("`{e}` is not an integer term"))),
        }
    }

    /// A whole-array term. Writes of a [`Expr::Store`] become a `store`
    /// chain with the first write outermost, so it shadows later ones.
    fn translate_array(&mut self, e: &Expr) -> Result<Array<'ctx>, VerifyError> {
        match e {
            Expr::Var(name) => {
                let (ty, term) = self.lookup(name)?;
                term.as_array()
                    .ok_or_else(|| unsupported(format!("`{name}` has sort {ty}, expected array")))
            }
            Expr::Store { base, writes } => {
                let mut array = self.translate_array(base)?;
                for (k, v) in writes.iter().rev() {
                    let k = self.translate_int(k)?;
                    let v = self.translate_int(v)?;
                    array = array.store(&k, &v);
                }
                Ok(array)
            }
            _ => Err(unsupported(format!("`{e}` is not an array term"))),
        }
    }


    fn translate_overrides(&mut self, sub: &Subscript) -> Result<Vec<(Int<'ctx>, Int<'ctx>)>, VerifyError> {
        sub.overrides
            .iter()
            .map(|(k, v)| Ok((self.translate_int(k)?, self.translate_int(v)?)))
            .collect()
    }

    /// `array[index]` after the writes in `overrides`; the first entry whose
    /// key equals `index` wins.
    fn select(&self, array: &Array<'ctx>, overrides: &[(Int<'ctx>, Int<'ctx>)], index: &Int<'ctx>) -> Int<'ctx> {
        let base = array
            .select(index)
            .as_int()
            .unwrap_or_else(|| Int::from_i64(self.ctx, 0));
        overrides
            .iter()
            .rev()
            .fold(base, |acc, (k, v)| index._eq(k).ite(v, &acc))
    }

    fn view(&mut self, e: &Expr) -> Result<View<'ctx>, VerifyError> {
        match e {
            Expr::Var(_) | Expr::Store { .. } => {
                let Some(name) = whole_array_name(e) else {
                    return Err(unsupported(format!("cannot bound array `{e}`")));
                };
                let len = self.length_of(name)?;
                Ok(View {
                    array: self.translate_array(e)?,
                    overrides: Vec::new(),
                    lower: Int::from_i64(self.ctx, 0),
                    len: Int::from_i64(self.ctx, len),
                })
            }
            Expr::Subscript(sub) => {
                let Expr::Slice { lower, upper } = sub.index.as_ref() else {
                    return Err(unsupported(format!("`{e}` is an element, not a slice")));
                };
                let array = self.translate_array(&sub.base)?;
                let overrides = self.translate_overrides(sub)?;
                let lower = self.translate_int(lower)?;
                let upper = match upper {
                    Some(upper) => self.translate_int(upper)?,
                    None => {
                        let Some(name) = sub.base_var() else {
                            return Err(unsupported(format!("cannot bound slice `{e}`")));
                        };
                        Int::from_i64(self.ctx, self.length_of(name)?)
                    }
                };
                let len = Int::sub(self.ctx, &[&upper, &lower]);
                Ok(View {
                    array,
                    overrides,
                    lower,
                    len,
                })
            }
            _ => Err(unsupported(format!("`{e}` is not an array view"))),
        }
    }

    fn read_view(&self, view: &View<'ctx>, offset: &Int<'ctx>) -> Int<'ctx> {
        let index = Int::add(self.ctx, &[&view.lower, offset]);
        self.select(&view.array, &view.overrides, &index)
    }

    /// Whole arrays compare extensionally over every index. As soon as one
    /// side is a slice, both sides are bounded views: equal length and
    /// pointwise equal elements.
    fn translate_array_comparison(&mut self, left: &Expr, op: Op, right: &Expr) -> Result<Bool<'ctx>, VerifyError> {
        let equal = if !left.is_slice_view() && !right.is_slice_view() {
            let l = self.translate_array(left)?;
            let r = self.translate_array(right)?;
            l._eq(&r)
        } else {
            let l = self.view(left)?;
            let r = self.view(right)?;
            self.offsets += 1;
            let j = Int::new_const(self.ctx, format!("slice$j{}", self.offsets));
            let zero = Int::from_i64(self.ctx, 0);
            let in_range = Bool::and(self.ctx, &[&j.ge(&zero), &j.lt(&l.len)]);
            let same = self.read_view(&l, &j)._eq(&self.read_view(&r, &j));
            let pointwise = ast::forall_const(self.ctx, &[&j as &dyn Ast<'ctx>], &[], &in_range.implies(&same));
            Bool::and(self.ctx, &[&l.len._eq(&r.len), &pointwise])
        };
        match op {
            Op::Eq => Ok(equal),
            Op::NEq => Ok(equal.not()),
            other => Err(unsupported(format!("`{other}` cannot compare arrays"))),
        }
    }

    fn translate_quantifier(&mut self, q: &Quantifier) -> Result<Bool<'ctx>, VerifyError> {
        let Some(ty) = q.ty else {
            return Err(unsupported(format!("bound variable `{}` has no resolved type", q.var)));
        };
        let bound = self.constant(&q.var, ty);
        self.bound.push((q.var.clone(), ty, bound.clone()));
        let body = self.translate_bool(&q.body);
        self.bound.pop();
        let body = body?;
        let vars: [&dyn Ast<'ctx>; 1] = [&bound];
        Ok(match q.kind {
            QuantKind::Forall => ast::forall_const(self.ctx, &vars, &[], &body),
            QuantKind::Exists => ast::exists_const(self.ctx, &vars, &[], &body),
        })
    }

    /// Values of the user-visible program variables in `model`.
    pub fn bindings(&self, model: &Model<'ctx>) -> Vec<Binding> {
        self.vars
            .iter()
            .filter(|(name, _)| !is_generated(name))
            .map(|(name, (ty, term))| Binding {
                name: name.clone(),
                ty: *ty,
                value: render(model, *ty, term),
            })
            .collect()
    }
}

fn render<'ctx>(model: &Model<'ctx>, ty: VarType, term: &Dynamic<'ctx>) -> String {
    let value = match ty {
        VarType::Int => term.as_int().and_then(|v| model.eval(&v, true)).map(|v| {
            v.as_i64()
                .map(|n| n.to_string())
                .unwrap_or_else(|| v.to_string())
        }),
        VarType::Bool => term.as_bool().and_then(|v| model.eval(&v, true)).map(|v| match v.as_bool() {
            Some(true) => "True".to_string(),
            Some(false) => "False".to_string(),
            None => v.to_string(),
        }),
        VarType::Array => term
            .as_array()
            .and_then(|v| model.eval(&v, true))
            .map(|v| v.to_string()),
    };
    value.unwrap_or_else(|| "<unknown>".to_string())
}
