use regex::Regex;

use super::errors::RenderBuildError;
use super::{OrderByItem, StructField};

lazy_static::lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

#[derive(Debug, PartialEq, Clone)]
pub enum RenderExpr {
    /// `*`, only meaningful as a `COUNT(*)` argument
    Star,
    Column(Column),
    PropertyAccessExp(PropertyAccess),
    Literal(Literal),
    /// Named bind parameter, rendered `@name`
    Parameter(String),
    OperatorApplicationExp(OperatorApplication),
    AggregateFnCall(AggregateFnCall),
    ScalarFnCall(ScalarFnCall),
    WindowFnCall(WindowFnCall),
    Cast(Cast),
    StructLiteral(Vec<StructField>),
    ArrayLiteral(Vec<RenderExpr>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Column(pub String);

impl Column {
    /// Column named by user input; rejects anything that is not a plain identifier.
    pub fn validated(name: &str) -> Result<Self, RenderBuildError> {
        if is_valid_identifier(name) {
            Ok(Column(name.to_string()))
        } else {
            Err(RenderBuildError::InvalidIdentifier(name.to_string()))
        }
    }
}

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

#[derive(Debug, PartialEq, Clone)]
pub struct TableAlias(pub String);

#[derive(Debug, PartialEq, Clone)]
pub struct ColumnAlias(pub String);

#[derive(Debug, PartialEq, Clone)]
pub struct PropertyAccess {
    pub table_alias: TableAlias,
    pub column: Column,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    /// Raw regular-expression literal `r"..."`
    Regex(String),
    Null,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Operator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    And,
    Or,
    Not,
    IsNull,
    IsNotNull,
    In,
    NotIn,
}

impl Operator {
    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Or => 1,
            Operator::And => 2,
            Operator::Not => 3,
            Operator::Equal
            | Operator::NotEqual
            | Operator::LessThan
            | Operator::GreaterThan
            | Operator::IsNull
            | Operator::IsNotNull
            | Operator::In
            | Operator::NotIn => 4,
            Operator::Addition | Operator::Subtraction => 5,
            Operator::Multiplication | Operator::Division => 6,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct OperatorApplication {
    pub operator: Operator,
    pub operands: Vec<RenderExpr>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct AggregateFnCall {
    pub name: String,
    pub args: Vec<RenderExpr>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ScalarFnCall {
    pub name: String,
    pub args: Vec<RenderExpr>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct WindowFnCall {
    pub name: String,
    pub args: Vec<RenderExpr>,
    pub partition_by: Vec<RenderExpr>,
    pub order_by: Vec<OrderByItem>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Cast {
    pub expr: Box<RenderExpr>,
    pub data_type: String,
    /// `SAFE_CAST` yields NULL instead of failing the query
    pub safe: bool,
}

impl RenderExpr {
    pub fn column(name: &str) -> Self {
        RenderExpr::Column(Column(name.to_string()))
    }

    pub fn property(alias: &str, column: &str) -> Self {
        RenderExpr::PropertyAccessExp(PropertyAccess {
            table_alias: TableAlias(alias.to_string()),
            column: Column(column.to_string()),
        })
    }

    pub fn string(value: &str) -> Self {
        RenderExpr::Literal(Literal::String(value.to_string()))
    }

    pub fn integer(value: i64) -> Self {
        RenderExpr::Literal(Literal::Integer(value))
    }

    pub fn float(value: f64) -> Self {
        RenderExpr::Literal(Literal::Float(value))
    }

    pub fn regex(pattern: &str) -> Self {
        RenderExpr::Literal(Literal::Regex(pattern.to_string()))
    }

    pub fn parameter(name: &str) -> Self {
        RenderExpr::Parameter(name.to_string())
    }

    pub fn operator(operator: Operator, operands: Vec<RenderExpr>) -> Self {
        RenderExpr::OperatorApplicationExp(OperatorApplication { operator, operands })
    }

    pub fn binary(lhs: RenderExpr, operator: Operator, rhs: RenderExpr) -> Self {
        Self::operator(operator, vec![lhs, rhs])
    }

    pub fn scalar(name: &str, args: Vec<RenderExpr>) -> Self {
        RenderExpr::ScalarFnCall(ScalarFnCall {
            name: name.to_string(),
            args,
        })
    }

    pub fn aggregate(name: &str, args: Vec<RenderExpr>) -> Self {
        RenderExpr::AggregateFnCall(AggregateFnCall {
            name: name.to_string(),
            args,
        })
    }

    pub fn window(
        name: &str,
        args: Vec<RenderExpr>,
        partition_by: Vec<RenderExpr>,
        order_by: Vec<OrderByItem>,
    ) -> Self {
        RenderExpr::WindowFnCall(WindowFnCall {
            name: name.to_string(),
            args,
            partition_by,
            order_by,
        })
    }

    pub fn cast(expr: RenderExpr, data_type: &str) -> Self {
        RenderExpr::Cast(Cast {
            expr: Box::new(expr),
            data_type: data_type.to_string(),
            safe: false,
        })
    }

    pub fn safe_cast(expr: RenderExpr, data_type: &str) -> Self {
        RenderExpr::Cast(Cast {
            expr: Box::new(expr),
            data_type: data_type.to_string(),
            safe: true,
        })
    }

    /// Fold predicates with AND; `None` when there are none.
    pub fn and_all(predicates: Vec<RenderExpr>) -> Option<RenderExpr> {
        match predicates.len() {
            0 => None,
            1 => predicates.into_iter().next(),
            _ => Some(RenderExpr::operator(Operator::And, predicates)),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        match self {
            RenderExpr::AggregateFnCall(_) => true,
            RenderExpr::OperatorApplicationExp(op) => op.operands.iter().any(Self::is_aggregate),
            RenderExpr::ScalarFnCall(call) => call.args.iter().any(Self::is_aggregate),
            RenderExpr::Cast(cast) => cast.expr.is_aggregate(),
            _ => false,
        }
    }
}
