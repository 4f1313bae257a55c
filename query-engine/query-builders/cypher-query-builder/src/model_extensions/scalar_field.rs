use crate::Context;
use cypher_ast::ast::{Expression, Function, Parameter, Variable};
use graph_value::GraphValue;
use query_structure::{FieldDescriptor, WriteTrigger};

pub(crate) trait ScalarFieldExt {
    /// `var.prop`, using the database name of the field.
    fn property_of(&self, var: &Variable) -> Expression;

    /// A parameter named `{var}_{field}` holding a written value.
    fn write_parameter(&self, var: &Variable, value: GraphValue, ctx: &Context<'_>) -> Parameter;

    /// The value a `@timestamp` or `@id(autogenerate)` field takes on `op`, if the field
    /// generates one inside the statement.
    fn generated_value(&self, op: WriteTrigger) -> Option<Expression>;
}

impl ScalarFieldExt for FieldDescriptor {
    fn property_of(&self, var: &Variable) -> Expression {
        var.property(&self.db_name)
    }

    fn write_parameter(&self, var: &Variable, value: GraphValue, ctx: &Context<'_>) -> Parameter {
        let name = ctx.parameter_name(&format!("{var}_{}", self.name));
        Parameter::new(name, value)
    }

    fn generated_value(&self, op: WriteTrigger) -> Option<Expression> {
        if self.timestamp.contains(op) {
            let function = self.scalar_kind().and_then(|kind| kind.now_function())?;
            return Some(Function::new(function).into());
        }

        if op == WriteTrigger::Create && self.id_autogenerate {
            return Some(Function::new("randomUUID").into());
        }

        None
    }
}
