use heapsql_core::value::ColumnType;

/// A literal appearing in a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColFlag {
    NotNull,
    Unique,
    PrimaryKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub flags: Vec<ColFlag>,
}

impl ColumnDef {
    pub fn has(&self, flag: &ColFlag) -> bool {
        self.flags.contains(flag)
    }
}

/// A column reference, optionally table-qualified. There is no alias
/// syntax in this grammar, so the qualifier, when present, is always a
/// real table name.
#[derive(Debug, Clone, PartialEq)]
pub struct ColRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColRef {
    pub fn unqualified(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

/// A single `col = literal` equality.
#[derive(Debug, Clone, PartialEq)]
pub struct Equality {
    pub col: ColRef,
    pub value: Literal,
}

/// A `JOIN t2 ON a = b` clause. The ON clause is always an equality
/// between two column references (an inter-table equality, not a
/// literal comparison).
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: String,
    pub left: ColRef,
    pub right: ColRef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectList {
    Star,
    Columns(Vec<ColRef>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    CreateIndex {
        index: String,
        table: String,
        column: String,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Literal>,
    },
    Select {
        select_list: SelectList,
        from: String,
        joins: Vec<JoinClause>,
        where_clause: Vec<Equality>,
    },
    Update {
        table: String,
        assignments: Vec<Assignment>,
        where_clause: Vec<Equality>,
    },
    Delete {
        table: String,
        where_clause: Vec<Equality>,
    },
}
