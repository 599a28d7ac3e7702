//! Scalar reconstruction rules.
//!
//! Every operator that is not a modified terminal knows how each of its scalar components is
//! computed from the scalar components of its operands. That knowledge is exposed as a
//! [`scalar_plan`](Expr::scalar_plan), which drives both value numbering (without building any
//! expression) and [`reconstruct`](Expr::reconstruct) (which builds scalar expressions).

use crate::{
    error::{MissingComponent, NoScalarPlan, NotModifiedTerminal, ScalarArity, UnboundIndex},
    expr::{ConditionKind, Expr, MathFunction, Op},
    index::{component_count, compute_indices, flat_index, free_dims, free_position, FreeIndex, Index},
    modified::{substitute, value_of},
};
use formc_error::Error;

/// A scalar operator, applied to scalar components of the operands of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarOp {
    Sum,
    Product,
    Division,
    Power,
    Math(MathFunction),
    Abs,
    Conj,
    Real,
    Imag,
    Condition(ConditionKind),
    Conditional,
}

impl ScalarOp {
    /// Returns the scalar operator computing each component of the given operator, if the
    /// operator computes its components pointwise.
    pub fn from_op(op: &Op) -> Option<Self> {
        Some(match op {
            Op::Sum => Self::Sum,
            Op::Product => Self::Product,
            Op::Division => Self::Division,
            Op::Power => Self::Power,
            Op::Math(func) => Self::Math(*func),
            Op::Abs => Self::Abs,
            Op::Conj => Self::Conj,
            Op::Real => Self::Real,
            Op::Imag => Self::Imag,
            Op::Condition(kind) => Self::Condition(*kind),
            Op::Conditional => Self::Conditional,
            _ => return None,
        })
    }

    /// Returns the name of the operator.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "+",
            Self::Product => "*",
            Self::Division => "/",
            Self::Power => "^",
            Self::Math(func) => func.name(),
            Self::Abs => "abs",
            Self::Conj => "conj",
            Self::Real => "real",
            Self::Imag => "imag",
            Self::Condition(kind) => kind.symbol(),
            Self::Conditional => "?:",
        }
    }

    /// Returns the number of scalars the operator expects.
    pub fn arity(&self) -> usize {
        match self {
            Self::Sum
                | Self::Product
                | Self::Division
                | Self::Power => 2,
            Self::Condition(ConditionKind::Not) => 1,
            Self::Condition(_) => 2,
            Self::Math(_)
                | Self::Abs
                | Self::Conj
                | Self::Real
                | Self::Imag => 1,
            Self::Conditional => 3,
        }
    }

    /// Builds the scalar expression applying this operator to the given scalars, in order.
    pub fn apply(&self, args: &[Expr]) -> Result<Expr, Error> {
        let arity = self.arity();
        if args.len() != arity {
            let source = args.iter()
                .map(|arg| arg.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::new(source, ScalarArity {
                op: self.name(),
                expected: arity,
                given: args.len(),
            }));
        }

        match self {
            Self::Sum => Expr::sum(&args[0], &args[1]),
            Self::Product => Expr::product(&args[0], &args[1]),
            Self::Division => Expr::division(&args[0], &args[1]),
            Self::Power => Expr::power(&args[0], &args[1]),
            Self::Math(func) => Expr::math(*func, &args[0]),
            Self::Abs => Ok(args[0].abs()),
            Self::Conj => Ok(args[0].conj()),
            Self::Real => Ok(args[0].real()),
            Self::Imag => Ok(args[0].imag()),
            Self::Condition(ConditionKind::Not) => Expr::not(&args[0]),
            Self::Condition(kind) => Expr::condition(*kind, &args[0], &args[1]),
            Self::Conditional => Expr::conditional(&args[0], &args[1], &args[2]),
        }
    }
}

/// A reference to one scalar component of one operand: `(operand position, component position)`.
pub type ComponentRef = (usize, usize);

/// How one scalar component of a node is computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Component {
    /// The component is the given component of an operand.
    Alias(ComponentRef),

    /// The component applies a scalar operator to the given operand components, in order.
    Apply(ScalarOp, Vec<ComponentRef>),

    /// The component folds the given operand components from the left with a binary scalar
    /// operator: `((c0 op c1) op c2) ...`. Every step is a scalar value of its own.
    Fold(ScalarOp, Vec<ComponentRef>),
}

impl Component {
    /// Computes this component.
    ///
    /// `lookup` resolves a reference to an operand component, and `apply` combines values with a
    /// scalar operator. A fold calls `apply` once per step, with the running value first.
    pub fn evaluate<T>(
        &self,
        mut lookup: impl FnMut(ComponentRef) -> Result<T, Error>,
        mut apply: impl FnMut(ScalarOp, Vec<T>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        match self {
            Self::Alias(reference) => lookup(*reference),
            Self::Apply(op, refs) => {
                let args = refs.iter()
                    .map(|&reference| lookup(reference))
                    .collect::<Result<Vec<_>, _>>()?;
                apply(*op, args)
            },
            Self::Fold(op, refs) => {
                let (&first, rest) = refs.split_first()
                    .ok_or_else(|| Error::new("", ScalarArity { op: op.name(), expected: 1, given: 0 }))?;
                let init = lookup(first)?;
                rest.iter().try_fold(init, |acc, &reference| {
                    let next = lookup(reference)?;
                    apply(*op, vec![acc, next])
                })
            },
        }
    }
}

/// Returns the position of a component of `operand` in its component order.
fn position_in(
    operand: &Expr,
    component: &[usize],
    value_of: impl Fn(FreeIndex) -> usize,
) -> usize {
    let free_count = component_count(&free_dims(operand.free_indices()));
    flat_index(operand.shape(), component) * free_count
        + free_position(operand.free_indices(), value_of)
}

impl Expr {
    /// Calls `f` with the shape component and free-index assignment of every scalar component of
    /// this expression, in component order.
    fn map_components<T>(
        &self,
        mut f: impl FnMut(&[usize], &[usize]) -> Result<T, Error>,
    ) -> Result<Vec<T>, Error> {
        let assignments = self.free_assignments();
        let mut out = Vec::with_capacity(self.value_count());
        for component in compute_indices(self.shape()) {
            for values in &assignments {
                out.push(f(&component, values)?);
            }
        }
        Ok(out)
    }

    /// Describes how each scalar component of this expression is computed from the scalar
    /// components of its operands, in component order.
    ///
    /// Modified terminals, multi-indices and labels have no plan; their components come from the
    /// terminal directly.
    pub fn scalar_plan(&self) -> Result<Vec<Component>, Error> {
        let operands = self.operands();
        let free = self.free_indices();

        if let Some(scalar_op) = ScalarOp::from_op(self.op()) {
            return self.map_components(|component, values| {
                let refs = operands.iter()
                    .enumerate()
                    .map(|(n, operand)| {
                        let component = if operand.rank() == 0 { &[][..] } else { component };
                        (n, position_in(operand, component, |i| value_of(free, values, i)))
                    })
                    .collect();
                Ok(Component::Apply(scalar_op, refs))
            });
        }

        match self.op() {
            Op::Variable => Ok((0..self.value_count()).map(|k| Component::Alias((0, k))).collect()),
            Op::ListTensor => {
                let per_item = operands[0].value_count();
                Ok((0..self.value_count())
                    .map(|k| Component::Alias((k / per_item, k % per_item)))
                    .collect())
            },
            Op::Indexed => {
                let tensor = &operands[0];
                let indices = self.multi_index_operand()?;
                self.map_components(|_, values| {
                    let component = substitute(indices, free, values);
                    Ok(Component::Alias((0, position_in(tensor, &component, |i| value_of(free, values, i)))))
                })
            },
            Op::ComponentTensor => {
                let scalar = &operands[0];
                let bound = self.multi_index_operand()?;
                self.map_components(|component, values| {
                    let value = |i: FreeIndex| {
                        bound.iter()
                            .position(|&index| index == Index::Free(i))
                            .map(|axis| component[axis])
                            .unwrap_or_else(|| value_of(free, values, i))
                    };
                    Ok(Component::Alias((0, position_in(scalar, &[], value))))
                })
            },
            Op::IndexSum => {
                let summand = &operands[0];
                let index = match self.multi_index_operand()? {
                    [Index::Free(index)] => *index,
                    _ => return Err(Error::new(self, NoScalarPlan { op: self.op().name() })),
                };
                let dim = summand.free_dim(index)
                    .ok_or_else(|| Error::new(summand, UnboundIndex { index: index.to_string() }))?;
                self.map_components(|component, values| {
                    let mut terms = (0..dim)
                        .map(|n| {
                            let value = |i: FreeIndex| if i == index { n } else { value_of(free, values, i) };
                            (0, position_in(summand, component, value))
                        })
                        .collect::<Vec<_>>();
                    if terms.len() == 1 {
                        Ok(Component::Alias(terms.remove(0)))
                    } else {
                        Ok(Component::Fold(ScalarOp::Sum, terms))
                    }
                })
            },
            op if op.is_terminal_modifier() && !self.is_modified_terminal() => {
                Err(Error::new(self, NotModifiedTerminal { op: op.name() }))
            },
            op => Err(Error::new(self, NoScalarPlan { op: op.name() })),
        }
    }

    /// Returns the entries of the multi-index operand of an indexing, index sum or component
    /// tensor.
    fn multi_index_operand(&self) -> Result<&[Index], Error> {
        self.operands()
            .get(1)
            .and_then(Expr::as_multi_index)
            .ok_or_else(|| Error::new(self, NoScalarPlan { op: self.op().name() }))
    }

    /// Reconstructs the scalar components of this expression from the scalar components of its
    /// operands.
    ///
    /// `operands` holds, for each operand, its scalar expressions in component order; operands
    /// without values (multi-indices and labels) hold none. Returns one scalar expression per
    /// component of this expression.
    pub fn reconstruct(&self, operands: &[Vec<Expr>]) -> Result<Vec<Expr>, Error> {
        let lookup = |(operand, component): ComponentRef| {
            operands.get(operand)
                .and_then(|scalars| scalars.get(component))
                .cloned()
                .ok_or_else(|| Error::new(self, MissingComponent { operand, component }))
        };

        self.scalar_plan()?
            .iter()
            .map(|component| component.evaluate(&lookup, |op, args| op.apply(&args)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::NoScalarPlan, expr::Side};
    use pretty_assertions::assert_eq;
    use super::*;

    fn scalars(expr: &Expr) -> Vec<Expr> {
        expr.scalar_components().unwrap()
    }

    #[test]
    fn pointwise_sum() {
        let u = Expr::coefficient("u", vec![2]);
        let w = Expr::coefficient("w", vec![2]);
        let sum = Expr::sum(&u, &w).unwrap();
        assert_eq!(sum.scalar_plan().unwrap(), vec![
            Component::Apply(ScalarOp::Sum, vec![(0, 0), (1, 0)]),
            Component::Apply(ScalarOp::Sum, vec![(0, 1), (1, 1)]),
        ]);

        let rebuilt = sum.reconstruct(&[scalars(&u), scalars(&w)]).unwrap();
        let rendered = rebuilt.iter().map(|e| e.to_string()).collect::<Vec<_>>();
        assert_eq!(rendered, vec!["u[0] + w[0]", "u[1] + w[1]"]);
    }

    #[test]
    fn product_broadcasts_free_indices() {
        let i = FreeIndex(0);
        let a = Expr::coefficient("a", vec![3]).indexed(&[Index::Free(i)]).unwrap();
        let c = Expr::coefficient("c", vec![]);
        let ac = Expr::product(&a, &c).unwrap();
        assert_eq!(ac.scalar_plan().unwrap(), vec![
            Component::Apply(ScalarOp::Product, vec![(0, 0), (1, 0)]),
            Component::Apply(ScalarOp::Product, vec![(0, 1), (1, 0)]),
            Component::Apply(ScalarOp::Product, vec![(0, 2), (1, 0)]),
        ]);
    }

    #[test]
    fn list_tensor_aliases_items() {
        let a = Expr::coefficient("a", vec![2]);
        let b = Expr::coefficient("b", vec![2]);
        let m = Expr::list_tensor(vec![a, b]).unwrap();
        assert_eq!(m.scalar_plan().unwrap(), vec![
            Component::Alias((0, 0)),
            Component::Alias((0, 1)),
            Component::Alias((1, 0)),
            Component::Alias((1, 1)),
        ]);
    }

    #[test]
    fn indexing_an_operator() {
        let a = Expr::coefficient("a", vec![]);
        let b = Expr::coefficient("b", vec![]);
        let v = Expr::list_tensor(vec![a.clone(), Expr::product(&a, &b).unwrap()]).unwrap();
        let v1 = v.component(&[1]).unwrap();
        assert_eq!(v1.scalar_plan().unwrap(), vec![Component::Alias((0, 1))]);

        let i = FreeIndex(0);
        let vi = v.indexed(&[Index::Free(i)]).unwrap();
        assert_eq!(vi.scalar_plan().unwrap(), vec![
            Component::Alias((0, 0)),
            Component::Alias((0, 1)),
        ]);
    }

    #[test]
    fn index_sum_contracts() {
        let i = FreeIndex(0);
        let j = FreeIndex(1);
        let a = Expr::coefficient("A", vec![2, 2]);
        let aij = a.indexed(&[Index::Free(i), Index::Free(j)]).unwrap();
        let summed = Expr::index_sum(&aij, j).unwrap();
        assert_eq!(summed.scalar_plan().unwrap(), vec![
            Component::Fold(ScalarOp::Sum, vec![(0, 0), (0, 1)]),
            Component::Fold(ScalarOp::Sum, vec![(0, 2), (0, 3)]),
        ]);

        let rebuilt = summed.reconstruct(&[scalars(&aij), Vec::new()]).unwrap();
        let rendered = rebuilt.iter().map(|e| e.to_string()).collect::<Vec<_>>();
        assert_eq!(rendered, vec!["A[0, 0] + A[0, 1]", "A[1, 0] + A[1, 1]"]);
    }

    #[test]
    fn long_index_sum_folds_pairwise() {
        let i = FreeIndex(0);
        let a = Expr::coefficient("a", vec![3]);
        let summed = Expr::index_sum(&a.indexed(&[Index::Free(i)]).unwrap(), i).unwrap();
        let plan = summed.scalar_plan().unwrap();
        assert_eq!(plan, vec![Component::Fold(ScalarOp::Sum, vec![(0, 0), (0, 1), (0, 2)])]);

        let mut steps = Vec::new();
        let total = plan[0].evaluate(
            |(_, k)| Ok(k.to_string()),
            |op, args| {
                assert_eq!(args.len(), 2);
                let step = format!("({} {} {})", args[0], op.name(), args[1]);
                steps.push(step.clone());
                Ok(step)
            },
        ).unwrap();
        assert_eq!(total, "((0 + 1) + 2)");
        assert_eq!(steps, vec!["(0 + 1)", "((0 + 1) + 2)"]);
    }

    #[test]
    fn empty_fold() {
        let fold = Component::Fold(ScalarOp::Sum, Vec::new());
        let err = fold.evaluate(|_| Ok(0), |_, _| Ok(0)).unwrap_err();
        assert!(err.is::<ScalarArity>());
    }

    #[test]
    fn trivial_index_sum_is_an_alias() {
        let i = FreeIndex(0);
        let a = Expr::coefficient("a", vec![1]).indexed(&[Index::Free(i)]).unwrap();
        let summed = Expr::index_sum(&a, i).unwrap();
        assert_eq!(summed.scalar_plan().unwrap(), vec![Component::Alias((0, 0))]);
    }

    #[test]
    fn component_tensor_transposes() {
        let i = FreeIndex(0);
        let j = FreeIndex(1);
        let a = Expr::coefficient("A", vec![2, 3]);
        let aij = a.indexed(&[Index::Free(i), Index::Free(j)]).unwrap();
        let transposed = Expr::component_tensor(&aij, &[j, i]).unwrap();
        assert_eq!(transposed.shape(), &[3, 2]);

        let plan = transposed.scalar_plan().unwrap()
            .into_iter()
            .map(|component| match component {
                Component::Alias((0, k)) => k,
                other => panic!("unexpected component {:?}", other),
            })
            .collect::<Vec<_>>();
        assert_eq!(plan, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn conditional_components() {
        let c = Expr::condition(ConditionKind::Lt, &Expr::coefficient("x", vec![]), &Expr::int(0)).unwrap();
        let t = Expr::coefficient("t", vec![2]);
        let f = Expr::coefficient("f", vec![2]);
        let cond = Expr::conditional(&c, &t, &f).unwrap();
        assert_eq!(cond.scalar_plan().unwrap(), vec![
            Component::Apply(ScalarOp::Conditional, vec![(0, 0), (1, 0), (2, 0)]),
            Component::Apply(ScalarOp::Conditional, vec![(0, 0), (1, 1), (2, 1)]),
        ]);
    }

    #[test]
    fn missing_operand_component() {
        let u = Expr::coefficient("u", vec![2]);
        let sum = Expr::sum(&u, &u).unwrap();
        let err = sum.reconstruct(&[scalars(&u), vec![u.component(&[0]).unwrap()]]).unwrap_err();
        assert_eq!(err.downcast_ref::<MissingComponent>(), Some(&MissingComponent {
            operand: 1,
            component: 1,
        }));
    }

    #[test]
    fn scalar_arity() {
        let a = Expr::coefficient("a", vec![]);
        let err = ScalarOp::Product.apply(&[a.clone()]).unwrap_err();
        assert_eq!(err.downcast_ref::<ScalarArity>(), Some(&ScalarArity {
            op: "*",
            expected: 2,
            given: 1,
        }));
        assert!(ScalarOp::Sum.apply(&[]).unwrap_err().is::<ScalarArity>());
        assert!(ScalarOp::Sum.apply(&[a.clone(), a.clone(), a]).unwrap_err().is::<ScalarArity>());
    }

    #[test]
    fn terminals_have_no_plan() {
        let u = Expr::argument(0, vec![]);
        assert!(u.scalar_plan().unwrap_err().is::<NoScalarPlan>());
        assert!(u.restricted(Side::Plus).scalar_plan().unwrap_err().is::<NoScalarPlan>());

        let sum = Expr::sum(&u, &u).unwrap();
        assert!(sum.grad(2).scalar_plan().unwrap_err().is::<NotModifiedTerminal>());
    }
}
