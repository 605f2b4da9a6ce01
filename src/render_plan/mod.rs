//! Query-fragment AST
//!
//! Generated queries are assembled as `RenderPlan` values (CTEs, joins,
//! aggregates, filters) and turned into text in one rendering step
//! (`sql_generator`). User-supplied values only ever enter a plan as escaped
//! string literals or validated identifiers.

pub mod errors;
pub mod render_expr;

use render_expr::{ColumnAlias, RenderExpr};

pub use errors::RenderBuildError;

pub trait ToSql {
    fn to_sql(&self) -> String;
}

/// One `SELECT` statement, optionally preceded by CTEs and followed by
/// further `UNION ALL` branches.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct RenderPlan {
    pub ctes: CteItems,
    pub select: SelectItems,
    pub from: FromTableItem,
    pub joins: JoinItems,
    pub filters: FilterItems,
    pub group_by: GroupByExpressions,
    pub order_by: OrderByItems,
    pub union: UnionItems,
}

impl RenderPlan {
    /// Plan selecting `items` from `source`.
    pub fn select_from(items: Vec<SelectItem>, source: FromSource) -> Self {
        RenderPlan {
            select: SelectItems {
                items,
                distinct: false,
            },
            from: FromTableItem(Some(source)),
            ..Default::default()
        }
    }

    pub fn with_join(mut self, join: Join) -> Self {
        self.joins.0.push(join);
        self
    }

    /// AND the given predicates into the WHERE clause.
    pub fn with_filters(mut self, predicates: Vec<RenderExpr>) -> Self {
        let mut all: Vec<RenderExpr> = self.filters.0.take().into_iter().collect();
        all.extend(predicates);
        self.filters = FilterItems(RenderExpr::and_all(all));
        self
    }

    pub fn with_group_by(mut self, exprs: Vec<RenderExpr>) -> Self {
        self.group_by.0.extend(exprs);
        self
    }

    pub fn with_order_by(mut self, items: Vec<OrderByItem>) -> Self {
        self.order_by.0.extend(items);
        self
    }

    pub fn with_ctes(mut self, ctes: Vec<Cte>) -> Self {
        self.ctes.0.extend(ctes);
        self
    }

    /// Append a `UNION ALL` branch.
    pub fn union_all(mut self, branch: RenderPlan) -> Self {
        match self.union.0.as_mut() {
            Some(union) => union.input.push(branch),
            None => {
                self.union.0 = Some(Union {
                    input: vec![branch],
                    union_type: UnionType::All,
                })
            }
        }
        self
    }

    /// Output column names, in select order.
    pub fn output_columns(&self) -> Vec<String> {
        self.select
            .items
            .iter()
            .filter_map(SelectItem::output_name)
            .collect()
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct SelectItems {
    pub items: Vec<SelectItem>,
    pub distinct: bool,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SelectItem {
    pub expression: RenderExpr,
    pub col_alias: Option<ColumnAlias>,
}

impl SelectItem {
    pub fn new(expression: RenderExpr) -> Self {
        SelectItem {
            expression,
            col_alias: None,
        }
    }

    pub fn aliased(expression: RenderExpr, alias: &str) -> Self {
        SelectItem {
            expression,
            col_alias: Some(ColumnAlias(alias.to_string())),
        }
    }

    /// Name the item is visible under to an enclosing query.
    pub fn output_name(&self) -> Option<String> {
        if let Some(alias) = &self.col_alias {
            return Some(alias.0.clone());
        }
        match &self.expression {
            RenderExpr::Column(column) => Some(column.0.clone()),
            RenderExpr::PropertyAccessExp(prop) => Some(prop.column.0.clone()),
            _ => None,
        }
    }
}

/// `<expr> AS <name>` inside a `STRUCT(...)` literal.
#[derive(Debug, PartialEq, Clone)]
pub struct StructField {
    pub expression: RenderExpr,
    pub name: String,
}

impl StructField {
    pub fn new(expression: RenderExpr, name: &str) -> Self {
        StructField {
            expression,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum TableSource {
    /// Warehouse table, rendered back-quoted.
    Table(String),
    /// A CTE defined earlier in the same statement.
    Cte(String),
    Subquery(Box<RenderPlan>),
    /// `UNNEST(<array expression>)`
    Unnest(RenderExpr),
}

#[derive(Debug, PartialEq, Clone)]
pub struct FromSource {
    pub source: TableSource,
    pub alias: Option<String>,
}

impl FromSource {
    pub fn table(name: &str) -> Self {
        FromSource {
            source: TableSource::Table(name.to_string()),
            alias: None,
        }
    }

    pub fn cte(name: &str, alias: Option<&str>) -> Self {
        FromSource {
            source: TableSource::Cte(name.to_string()),
            alias: alias.map(str::to_string),
        }
    }

    pub fn subquery(plan: RenderPlan, alias: Option<&str>) -> Self {
        FromSource {
            source: TableSource::Subquery(Box::new(plan)),
            alias: alias.map(str::to_string),
        }
    }

    pub fn unnest(array: RenderExpr, alias: &str) -> Self {
        FromSource {
            source: TableSource::Unnest(array),
            alias: Some(alias.to_string()),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct FromTableItem(pub Option<FromSource>);

#[derive(Debug, PartialEq, Clone, Default)]
pub struct FilterItems(pub Option<RenderExpr>);

#[derive(Debug, PartialEq, Clone, Default)]
pub struct GroupByExpressions(pub Vec<RenderExpr>);

#[derive(Debug, PartialEq, Clone, Default)]
pub struct JoinItems(pub Vec<Join>);

#[derive(Debug, PartialEq, Clone)]
pub struct Join {
    pub source: FromSource,
    pub joining_on: Vec<RenderExpr>,
    pub join_type: JoinType,
}

impl Join {
    pub fn new(join_type: JoinType, source: FromSource, joining_on: Vec<RenderExpr>) -> Self {
        Join {
            source,
            joining_on,
            join_type,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum JoinType {
    Inner,
    Left,
    Cross,
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct CteItems(pub Vec<Cte>);

#[derive(Debug, PartialEq, Clone)]
pub struct Cte {
    pub cte_name: String,
    pub plan: RenderPlan,
}

impl Cte {
    pub fn new(cte_name: impl Into<String>, plan: RenderPlan) -> Self {
        Self {
            cte_name: cte_name.into(),
            plan,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct OrderByItems(pub Vec<OrderByItem>);

#[derive(Debug, PartialEq, Clone)]
pub struct OrderByItem {
    pub expression: RenderExpr,
    pub order: OrderByOrder,
}

impl OrderByItem {
    pub fn asc(expression: RenderExpr) -> Self {
        OrderByItem {
            expression,
            order: OrderByOrder::Asc,
        }
    }

    pub fn desc(expression: RenderExpr) -> Self {
        OrderByItem {
            expression,
            order: OrderByOrder::Desc,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum OrderByOrder {
    Asc,
    Desc,
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct UnionItems(pub Option<Union>);

/// Branches appended after the plan's own `SELECT`.
#[derive(Debug, PartialEq, Clone)]
pub struct Union {
    pub input: Vec<RenderPlan>,
    pub union_type: UnionType,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnionType {
    Distinct,
    All,
}
