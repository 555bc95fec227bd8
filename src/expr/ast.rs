use super::EvalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
}

/// Numeric sub-expression over the two bound slots.
#[derive(Debug, Clone, PartialEq)]
pub enum NumExpr {
    Literal(f64),
    X,
    Y,
    Neg(Box<NumExpr>),
    Binary(ArithOp, Box<NumExpr>, Box<NumExpr>),
}

/// Boolean predicate tree. Produced only by the type-checking parser.
#[derive(Debug, Clone, PartialEq)]
pub enum BoolExpr {
    Compare(CmpOp, Box<NumExpr>, Box<NumExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
}

impl NumExpr {
    pub fn eval(&self, x: f64, y: f64) -> Result<f64, EvalError> {
        let value = match self {
            NumExpr::Literal(v) => *v,
            NumExpr::X => x,
            NumExpr::Y => y,
            NumExpr::Neg(inner) => -inner.eval(x, y)?,
            NumExpr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(x, y)?;
                let b = rhs.eval(x, y)?;
                match op {
                    ArithOp::Add => a + b,
                    ArithOp::Sub => a - b,
                    ArithOp::Mul => a * b,
                    ArithOp::Div => {
                        if b == 0.0 {
                            return Err(EvalError::DivisionByZero);
                        }
                        a / b
                    }
                }
            }
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NonFinite)
        }
    }

    pub fn is_constant(&self) -> bool {
        match self {
            NumExpr::Literal(_) => true,
            NumExpr::X | NumExpr::Y => false,
            NumExpr::Neg(inner) => inner.is_constant(),
            NumExpr::Binary(_, lhs, rhs) => lhs.is_constant() && rhs.is_constant(),
        }
    }

    fn constant_fault(&self) -> Option<EvalError> {
        if self.is_constant() {
            return self.eval(0.0, 0.0).err();
        }
        match self {
            NumExpr::Literal(_) | NumExpr::X | NumExpr::Y => None,
            NumExpr::Neg(inner) => inner.constant_fault(),
            NumExpr::Binary(_, lhs, rhs) => lhs.constant_fault().or_else(|| rhs.constant_fault()),
        }
    }
}

impl BoolExpr {
    /// `&&` and `||` short-circuit, so a faulting right-hand side is only
    /// reached when the left side does not decide the result.
    pub fn eval(&self, x: f64, y: f64) -> Result<bool, EvalError> {
        match self {
            BoolExpr::Compare(op, lhs, rhs) => {
                let a = lhs.eval(x, y)?;
                let b = rhs.eval(x, y)?;
                Ok(match op {
                    CmpOp::Ge => a >= b,
                    CmpOp::Le => a <= b,
                    CmpOp::Gt => a > b,
                    CmpOp::Lt => a < b,
                    CmpOp::Eq => a == b,
                    CmpOp::Ne => a != b,
                })
            }
            BoolExpr::And(lhs, rhs) => Ok(lhs.eval(x, y)? && rhs.eval(x, y)?),
            BoolExpr::Or(lhs, rhs) => Ok(lhs.eval(x, y)? || rhs.eval(x, y)?),
        }
    }

    pub(crate) fn constant_fault(&self) -> Option<EvalError> {
        match self {
            BoolExpr::Compare(_, lhs, rhs) => lhs.constant_fault().or_else(|| rhs.constant_fault()),
            BoolExpr::And(lhs, rhs) | BoolExpr::Or(lhs, rhs) => {
                lhs.constant_fault().or_else(|| rhs.constant_fault())
            }
        }
    }
}
