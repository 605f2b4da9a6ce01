use crate::render_plan::{
    render_expr::{
        AggregateFnCall, Cast, Literal, Operator, OperatorApplication, RenderExpr, ScalarFnCall,
        WindowFnCall,
    },
    Cte, CteItems, FilterItems, FromSource, FromTableItem, GroupByExpressions, Join, JoinItems,
    JoinType, OrderByItem, OrderByItems, OrderByOrder, RenderPlan, SelectItems, StructField,
    TableSource, ToSql, UnionItems, UnionType,
};

const INDENT: &str = "   ";

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{INDENT}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single-quoted string literal with backslash and quote escaping.
pub fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

impl ToSql for RenderPlan {
    fn to_sql(&self) -> String {
        let mut sql = String::new();
        sql.push_str(&self.ctes.to_sql());
        sql.push_str(&self.select.to_sql());
        sql.push_str(&self.from.to_sql());
        sql.push_str(&self.joins.to_sql());
        sql.push_str(&self.filters.to_sql());
        sql.push_str(&self.group_by.to_sql());
        sql.push_str(&self.union.to_sql());
        sql.push_str(&self.order_by.to_sql());
        sql
    }
}

impl ToSql for CteItems {
    fn to_sql(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let ctes: Vec<String> = self.0.iter().map(|cte| cte.to_sql()).collect();
        format!("WITH\n{}\n", ctes.join(",\n"))
    }
}

impl ToSql for Cte {
    fn to_sql(&self) -> String {
        format!(
            "{} AS (\n{}\n)",
            self.cte_name,
            self.plan.to_sql().trim_end()
        )
    }
}

impl ToSql for SelectItems {
    fn to_sql(&self) -> String {
        let mut sql = String::new();
        if self.items.is_empty() {
            return sql;
        }

        if self.distinct {
            sql.push_str("SELECT DISTINCT\n");
        } else {
            sql.push_str("SELECT\n");
        }

        for (i, item) in self.items.iter().enumerate() {
            sql.push_str(INDENT);
            sql.push_str(&item.expression.to_sql());
            if let Some(alias) = &item.col_alias {
                sql.push_str(" AS ");
                sql.push_str(&alias.0);
            }
            if i + 1 < self.items.len() {
                sql.push(',');
            }
            sql.push('\n');
        }
        sql
    }
}

impl ToSql for FromSource {
    fn to_sql(&self) -> String {
        let source = match &self.source {
            TableSource::Table(name) => format!("`{}`", name),
            TableSource::Cte(name) => name.clone(),
            TableSource::Subquery(plan) => format!("(\n{}\n)", indent(plan.to_sql().trim_end())),
            TableSource::Unnest(array) => format!("UNNEST({})", array.to_sql()),
        };
        match &self.alias {
            Some(alias) => format!("{} AS {}", source, alias),
            None => source,
        }
    }
}

impl ToSql for FromTableItem {
    fn to_sql(&self) -> String {
        match &self.0 {
            Some(source) => format!("FROM {}\n", source.to_sql()),
            None => String::new(),
        }
    }
}

impl ToSql for JoinItems {
    fn to_sql(&self) -> String {
        self.0.iter().map(|join| join.to_sql()).collect()
    }
}

impl ToSql for Join {
    fn to_sql(&self) -> String {
        let join_type_str = match self.join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Cross => "CROSS JOIN",
        };

        let mut sql = format!("{} {}\n", join_type_str, self.source.to_sql());

        // CROSS JOIN takes no condition
        if !self.joining_on.is_empty() && self.join_type != JoinType::Cross {
            let conditions: Vec<String> = self
                .joining_on
                .iter()
                .map(|cond| render_operand(Operator::And, cond, false))
                .collect();
            sql.push_str(&format!("ON {}\n", conditions.join("\n   AND ")));
        }
        sql
    }
}

impl ToSql for FilterItems {
    fn to_sql(&self) -> String {
        match &self.0 {
            Some(expr) => format!("WHERE {}\n", expr.to_sql()),
            None => String::new(),
        }
    }
}

impl ToSql for GroupByExpressions {
    fn to_sql(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let exprs: Vec<String> = self.0.iter().map(|e| e.to_sql()).collect();
        format!("GROUP BY {}\n", exprs.join(", "))
    }
}

impl ToSql for OrderByItem {
    fn to_sql(&self) -> String {
        format!("{} {}", self.expression.to_sql(), self.order.to_sql())
    }
}

impl ToSql for OrderByItems {
    fn to_sql(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let items: Vec<String> = self.0.iter().map(|item| item.to_sql()).collect();
        format!("ORDER BY {}\n", items.join(", "))
    }
}

impl ToSql for OrderByOrder {
    fn to_sql(&self) -> String {
        match self {
            OrderByOrder::Asc => "ASC".to_string(),
            OrderByOrder::Desc => "DESC".to_string(),
        }
    }
}

impl ToSql for UnionItems {
    fn to_sql(&self) -> String {
        let Some(union) = &self.0 else {
            return String::new();
        };
        let keyword = match union.union_type {
            UnionType::Distinct => "UNION DISTINCT\n",
            UnionType::All => "UNION ALL\n",
        };
        union
            .input
            .iter()
            .map(|branch| format!("{}{}", keyword, branch.to_sql()))
            .collect()
    }
}

impl ToSql for StructField {
    fn to_sql(&self) -> String {
        format!("{} AS {}", self.expression.to_sql(), self.name)
    }
}

impl ToSql for Literal {
    fn to_sql(&self) -> String {
        match self {
            Literal::Integer(i) => i.to_string(),
            Literal::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{:.1}", f)
                } else {
                    f.to_string()
                }
            }
            Literal::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Literal::String(s) => quote_string(s),
            Literal::Regex(pattern) => format!("r\"{}\"", pattern),
            Literal::Null => "NULL".to_string(),
        }
    }
}

fn call(name: &str, args: &[RenderExpr]) -> String {
    let rendered: Vec<String> = args.iter().map(|a| a.to_sql()).collect();
    format!("{}({})", name, rendered.join(", "))
}

impl ToSql for AggregateFnCall {
    fn to_sql(&self) -> String {
        call(&self.name, &self.args)
    }
}

impl ToSql for ScalarFnCall {
    fn to_sql(&self) -> String {
        call(&self.name, &self.args)
    }
}

impl ToSql for WindowFnCall {
    fn to_sql(&self) -> String {
        let mut window = Vec::new();
        if !self.partition_by.is_empty() {
            let partition: Vec<String> = self.partition_by.iter().map(|e| e.to_sql()).collect();
            window.push(format!("PARTITION BY {}", partition.join(", ")));
        }
        if !self.order_by.is_empty() {
            let order: Vec<String> = self.order_by.iter().map(|o| o.to_sql()).collect();
            window.push(format!("ORDER BY {}", order.join(", ")));
        }
        format!("{} OVER ({})", call(&self.name, &self.args), window.join(" "))
    }
}

impl ToSql for Cast {
    fn to_sql(&self) -> String {
        let function = if self.safe { "SAFE_CAST" } else { "CAST" };
        format!("{}({} AS {})", function, self.expr.to_sql(), self.data_type)
    }
}

/// Render an operand, parenthesised when it binds looser than its parent.
fn render_operand(parent: Operator, operand: &RenderExpr, is_right: bool) -> String {
    let rendered = operand.to_sql();
    if let RenderExpr::OperatorApplicationExp(child) = operand {
        let child_precedence = child.operator.precedence();
        let parent_precedence = parent.precedence();
        let non_associative = matches!(parent, Operator::Subtraction | Operator::Division);
        if child_precedence < parent_precedence
            || (is_right && non_associative && child_precedence == parent_precedence)
        {
            return format!("({})", rendered);
        }
    }
    rendered
}

impl ToSql for OperatorApplication {
    fn to_sql(&self) -> String {
        fn op_str(o: Operator) -> &'static str {
            match o {
                Operator::Addition => "+",
                Operator::Subtraction => "-",
                Operator::Multiplication => "*",
                Operator::Division => "/",
                Operator::Equal => "=",
                Operator::NotEqual => "<>",
                Operator::LessThan => "<",
                Operator::GreaterThan => ">",
                Operator::And => "AND",
                Operator::Or => "OR",
                Operator::Not => "NOT",
                Operator::IsNull => "IS NULL",
                Operator::IsNotNull => "IS NOT NULL",
                Operator::In => "IN",
                Operator::NotIn => "NOT IN",
            }
        }

        let operator = self.operator;
        match operator {
            Operator::Not => match self.operands.first() {
                Some(operand) => format!("NOT {}", render_operand(operator, operand, false)),
                None => String::new(),
            },
            Operator::IsNull | Operator::IsNotNull => match self.operands.first() {
                Some(operand) => format!(
                    "{} {}",
                    render_operand(operator, operand, false),
                    op_str(operator)
                ),
                None => String::new(),
            },
            _ => {
                let rendered: Vec<String> = self
                    .operands
                    .iter()
                    .enumerate()
                    .map(|(i, operand)| render_operand(operator, operand, i > 0))
                    .collect();
                rendered.join(&format!(" {} ", op_str(operator)))
            }
        }
    }
}

impl ToSql for RenderExpr {
    fn to_sql(&self) -> String {
        match self {
            RenderExpr::Star => "*".to_string(),
            RenderExpr::Column(column) => column.0.clone(),
            RenderExpr::PropertyAccessExp(prop) => {
                format!("{}.{}", prop.table_alias.0, prop.column.0)
            }
            RenderExpr::Literal(literal) => literal.to_sql(),
            RenderExpr::Parameter(name) => format!("@{}", name),
            RenderExpr::OperatorApplicationExp(op) => op.to_sql(),
            RenderExpr::AggregateFnCall(agg) => agg.to_sql(),
            RenderExpr::ScalarFnCall(call) => call.to_sql(),
            RenderExpr::WindowFnCall(window) => window.to_sql(),
            RenderExpr::Cast(cast) => cast.to_sql(),
            RenderExpr::StructLiteral(fields) => {
                let rendered: Vec<String> = fields.iter().map(|f| f.to_sql()).collect();
                format!("STRUCT({})", rendered.join(", "))
            }
            RenderExpr::ArrayLiteral(elements) => {
                let rendered: Vec<String> = elements.iter().map(|e| e.to_sql()).collect();
                if elements
                    .iter()
                    .any(|e| matches!(e, RenderExpr::StructLiteral(_)))
                {
                    let lines: Vec<String> =
                        rendered.iter().map(|r| format!("  {}", r)).collect();
                    format!("[\n{}\n]", lines.join(",\n"))
                } else {
                    format!("[{}]", rendered.join(", "))
                }
            }
        }
    }
}
