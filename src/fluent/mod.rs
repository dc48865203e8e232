// Fluent statement construction: the mutable-until-rendered statement
// description, composable condition trees, the SQL renderer, and the
// session-bound executable form.

mod arg;
mod condition;
mod executable;
mod renderer;
mod statement;

pub use arg::{Arg, RawSql};
pub use condition::{BoolOperator, Condition};
pub use executable::BoundStatement;
pub use statement::{
    ColumnExpr, CombineKind, CombineSource, JoinKind, ParamKey, SelectItem, Statement,
    StatementKind, TableSource,
};
