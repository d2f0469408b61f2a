//! High-school scholarship rule set
//!
//! Amounts come from three tables (one per school operator) sharing the same
//! layout: rows are recipient categories, columns are course types. Two
//! household-level candidates are computed independently, one for households
//! on public assistance and one for the remaining non-tuition support, and
//! then combined with the min/max composition pattern into a monthly amount.

use super::composition::{monthly, Combine};
use crate::aggregate;
use crate::engine::{Array, Context, Registry, ValueType, Variable};
use crate::enums::{Category, OrdinalMap};
use crate::error::{EngineError, Result};
use crate::parameters::AmountTable;
use crate::population::{EntityKind, Role};
use crate::select::{select, Choice};
use chrono::Datelike;
use std::ops::RangeInclusive;

pub const TABLE_NATIONAL: &str = "high_school_scholarship/national";
pub const TABLE_PUBLIC: &str = "high_school_scholarship/public";
pub const TABLE_PRIVATE: &str = "high_school_scholarship/private";

pub const PARAM_LOW_INCOME_LEVY: &str = "welfare.childcare.high_school_scholarship.income_levy_low_income";
pub const PARAM_LARGE_FAMILY_LEVY: &str = "welfare.childcare.high_school_scholarship.income_levy_large_family";
pub const PARAM_LARGE_FAMILY_DEPENDANTS: &str =
    "welfare.childcare.high_school_scholarship.large_family_dependants";

/// School grades counted as high school
pub const HIGH_SCHOOL_GRADES: RangeInclusive<i64> = 10..=12;

/// Children at or above this age are not counted when ranking siblings
pub const SIBLING_AGE_LIMIT: i64 = 23;

/// Course a student is enrolled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseType {
    None,
    FullTime,
    PartTime,
    Correspondence,
    Advanced,
}

impl Category for CourseType {
    const NAME: &'static str = "CourseType";
    const VARIANTS: &'static [Self] = &[
        CourseType::None,
        CourseType::FullTime,
        CourseType::PartTime,
        CourseType::Correspondence,
        CourseType::Advanced,
    ];

    fn name(&self) -> &'static str {
        match self {
            CourseType::None => "none",
            CourseType::FullTime => "full_time",
            CourseType::PartTime => "part_time",
            CourseType::Correspondence => "correspondence",
            CourseType::Advanced => "advanced",
        }
    }
}

/// Who runs the school
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchoolOperator {
    None,
    National,
    Public,
    Private,
}

impl Category for SchoolOperator {
    const NAME: &'static str = "SchoolOperator";
    const VARIANTS: &'static [Self] = &[
        SchoolOperator::None,
        SchoolOperator::National,
        SchoolOperator::Public,
        SchoolOperator::Private,
    ];

    fn name(&self) -> &'static str {
        match self {
            SchoolOperator::None => "none",
            SchoolOperator::National => "national",
            SchoolOperator::Public => "public",
            SchoolOperator::Private => "private",
        }
    }
}

/// Table row a recipient is paid from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientCategory {
    PublicAssistance,
    TaxExemptFirstChild,
    TaxExemptOtherChild,
    AdvancedCourseLowIncome,
}

impl Category for RecipientCategory {
    const NAME: &'static str = "RecipientCategory";
    const VARIANTS: &'static [Self] = &[
        RecipientCategory::PublicAssistance,
        RecipientCategory::TaxExemptFirstChild,
        RecipientCategory::TaxExemptOtherChild,
        RecipientCategory::AdvancedCourseLowIncome,
    ];

    fn name(&self) -> &'static str {
        match self {
            RecipientCategory::PublicAssistance => "public_assistance",
            RecipientCategory::TaxExemptFirstChild => "tax_exempt_first_child",
            RecipientCategory::TaxExemptOtherChild => "tax_exempt_other_child",
            RecipientCategory::AdvancedCourseLowIncome => "advanced_course_low_income",
        }
    }
}

pub fn category_rows() -> OrdinalMap<RecipientCategory> {
    OrdinalMap::new(&[
        (RecipientCategory::PublicAssistance, 0),
        (RecipientCategory::TaxExemptFirstChild, 1),
        (RecipientCategory::TaxExemptOtherChild, 2),
        (RecipientCategory::AdvancedCourseLowIncome, 3),
    ])
}

/// `CourseType::None` has no column and maps to the sentinel
pub fn course_columns() -> OrdinalMap<CourseType> {
    OrdinalMap::new(&[
        (CourseType::FullTime, 0),
        (CourseType::PartTime, 1),
        (CourseType::Correspondence, 2),
        (CourseType::Advanced, 3),
    ])
}

/// Tables for the three school operators
pub struct OperatorTables<'a> {
    pub national: &'a AmountTable,
    pub public: &'a AmountTable,
    pub private: &'a AmountTable,
}

/// Annual amount per person from the operator's table
///
/// Only `eligible` persons with a known operator are looked up; an eligible
/// person whose category or course has no ordinal is a table bounds error.
pub fn annual_amounts(
    tables: &OperatorTables<'_>,
    operators: &[SchoolOperator],
    categories: &[RecipientCategory],
    courses: &[CourseType],
    eligible: &[bool],
) -> Result<Vec<i64>> {
    let rows = category_rows().ordinals(categories)?;
    let cols = course_columns().ordinals(courses)?;
    let operated_by = |op: SchoolOperator| -> Vec<bool> {
        operators
            .iter()
            .zip(eligible)
            .map(|(o, &e)| e && *o == op)
            .collect()
    };
    let national = operated_by(SchoolOperator::National);
    let public = operated_by(SchoolOperator::Public);
    let private = operated_by(SchoolOperator::Private);

    select(
        operators.len(),
        vec![
            (&national[..], Choice::lookup(tables.national, &rows, &cols)),
            (&public[..], Choice::lookup(tables.public, &rows, &cols)),
            (&private[..], Choice::lookup(tables.private, &rows, &cols)),
        ],
        0,
    )
}

fn amounts_for(
    ctx: &mut Context<'_, '_>,
    categories: &[RecipientCategory],
    courses: &[CourseType],
    eligible: &[bool],
) -> Result<Vec<i64>> {
    let operators = ctx.categories::<SchoolOperator>("school_operator")?;
    let national = ctx.table(TABLE_NATIONAL)?;
    let public = ctx.table(TABLE_PUBLIC)?;
    let private = ctx.table(TABLE_PRIVATE)?;
    let tables = OperatorTables {
        national: &national,
        public: &public,
        private: &private,
    };
    annual_amounts(&tables, &operators, categories, courses, eligible)
}

fn and(a: &[bool], b: &[bool]) -> Vec<bool> {
    a.iter().zip(b).map(|(&x, &y)| x && y).collect()
}

/// Age reached in the period's calendar year; 0 when the birth year is unknown
fn age(ctx: &mut Context<'_, '_>) -> Result<Array> {
    let year = ctx
        .period()
        .start()
        .map(|date| i64::from(date.year()))
        .ok_or_else(|| EngineError::InvalidPeriod(format!("age needs a dated period, got {}", ctx.period())))?;
    let births = ctx.ints("birth_year")?;
    Ok(Array::Int(
        births
            .iter()
            .map(|&born| if born > 0 { (year - born).max(0) } else { 0 })
            .collect(),
    ))
}

fn is_high_school_student(ctx: &mut Context<'_, '_>) -> Result<Array> {
    let grades = ctx.ints("grade")?;
    let courses = ctx.categories::<CourseType>("course_type")?;
    Ok(Array::Bool(
        grades
            .iter()
            .zip(&courses)
            .map(|(g, c)| HIGH_SCHOOL_GRADES.contains(g) && *c != CourseType::None)
            .collect(),
    ))
}

fn household_has_correspondence_student(ctx: &mut Context<'_, '_>) -> Result<Array> {
    let courses = ctx.member_categories::<CourseType>("course_type")?;
    let correspondence: Vec<bool> = courses.iter().map(|c| *c == CourseType::Correspondence).collect();
    aggregate::any(ctx.population(), &correspondence).map(Array::Bool)
}

fn public_assistance_scholarship(ctx: &mut Context<'_, '_>) -> Result<Array> {
    let eligible = and(&ctx.has_role(Role::Child), &ctx.bools("is_high_school_student")?);
    let courses = ctx.categories::<CourseType>("course_type")?;
    let categories = vec![RecipientCategory::PublicAssistance; ctx.len()];
    amounts_for(ctx, &categories, &courses, &eligible).map(Array::Int)
}

fn tax_exempt_scholarship(ctx: &mut Context<'_, '_>) -> Result<Array> {
    let children = ctx.has_role(Role::Child);
    let ages = ctx.ints("age")?;
    let counted: Vec<bool> = children
        .iter()
        .zip(&ages)
        .map(|(&child, &age)| child && age < SIBLING_AGE_LIMIT)
        .collect();
    let ranks = aggregate::rank(ctx.population(), &ages, Some(&counted))?;

    let courses = ctx.categories::<CourseType>("course_type")?;
    let has_correspondence = ctx.household_bools("household_has_correspondence_student")?;

    // eldest counted child, no correspondence student at home, day course
    let first_child: Vec<bool> = (0..ctx.len())
        .map(|i| {
            ranks[i] == Some(0)
                && !has_correspondence[i]
                && matches!(courses[i], CourseType::FullTime | CourseType::PartTime)
        })
        .collect();
    let categories = select(
        ctx.len(),
        vec![(&first_child[..], Choice::Const(RecipientCategory::TaxExemptFirstChild))],
        RecipientCategory::TaxExemptOtherChild,
    )?;

    let eligible = and(&children, &ctx.bools("is_high_school_student")?);
    amounts_for(ctx, &categories, &courses, &eligible).map(Array::Int)
}

fn advanced_course_scholarship(ctx: &mut Context<'_, '_>) -> Result<Array> {
    let low_income_limit = ctx.parameter(PARAM_LOW_INCOME_LEVY)? as i64;
    let large_family_limit = ctx.parameter(PARAM_LARGE_FAMILY_LEVY)? as i64;
    let large_family_dependants = ctx.parameter(PARAM_LARGE_FAMILY_DEPENDANTS)? as i64;

    let prefectural = ctx.household_ints("prefectural_income_levy")?;
    let municipal = ctx.household_ints("municipal_income_levy")?;
    let dependants = ctx.household_ints("dependants")?;
    let tax_exempt = ctx.household_bools("resident_tax_exempt")?;

    let courses = ctx.categories::<CourseType>("course_type")?;
    let students = ctx.bools("is_high_school_student")?;
    let children = ctx.has_role(Role::Child);

    let eligible: Vec<bool> = (0..ctx.len())
        .map(|i| {
            let levy = prefectural[i] + municipal[i];
            let low_income = levy <= low_income_limit;
            let large_family = levy <= large_family_limit && dependants[i] >= large_family_dependants;
            children[i]
                && students[i]
                && courses[i] == CourseType::Advanced
                && !tax_exempt[i]
                && (low_income || large_family)
        })
        .collect();

    let categories = vec![RecipientCategory::AdvancedCourseLowIncome; ctx.len()];
    amounts_for(ctx, &categories, &courses, &eligible).map(Array::Int)
}

fn public_assistance_scholarship_total(ctx: &mut Context<'_, '_>) -> Result<Array> {
    let on_assistance: Vec<bool> = ctx.ints("public_assistance")?.iter().map(|&x| x > 0).collect();
    let amounts = ctx.member_ints("public_assistance_scholarship")?;
    let totals = aggregate::sum(ctx.population(), &amounts, None)?;
    Ok(Array::Int(
        totals
            .iter()
            .zip(&on_assistance)
            .map(|(&t, &on)| if on { t } else { 0 })
            .collect(),
    ))
}

fn non_tuition_scholarship_total(ctx: &mut Context<'_, '_>) -> Result<Array> {
    let on_assistance: Vec<bool> = ctx.ints("public_assistance")?.iter().map(|&x| x > 0).collect();
    let tax_exempt = ctx.bools("resident_tax_exempt")?;

    let exempt_amounts = ctx.member_ints("tax_exempt_scholarship")?;
    let exempt_totals = aggregate::sum(ctx.population(), &exempt_amounts, None)?;
    let advanced_amounts = ctx.member_ints("advanced_course_scholarship")?;
    let advanced_totals = aggregate::sum(ctx.population(), &advanced_amounts, None)?;

    Ok(Array::Int(
        (0..ctx.len())
            .map(|h| {
                let exempt = if tax_exempt[h] { exempt_totals[h] } else { 0 };
                if on_assistance[h] {
                    0
                } else {
                    exempt + advanced_totals[h]
                }
            })
            .collect(),
    ))
}

fn scholarship(ctx: &mut Context<'_, '_>, variant: Combine) -> Result<Array> {
    let assistance = ctx.ints("public_assistance_scholarship_total")?;
    let non_tuition = ctx.ints("non_tuition_scholarship_total")?;
    monthly(&assistance, &non_tuition, variant).map(Array::Int)
}

/// Register inputs and formulas of the scholarship rule set
pub fn register(registry: &mut Registry) -> Result<()> {
    use EntityKind::{Household, Person};

    let variables = vec![
        Variable::input("birth_year", Person, ValueType::Int)
            .eternal()
            .with_label("Calendar year of birth"),
        Variable::computed("age", Person, ValueType::Int, age).with_label("Age in years"),
        Variable::input("grade", Person, ValueType::Int).with_label("School grade, 10-12 in high school"),
        Variable::category_input::<CourseType>("course_type", Person),
        Variable::category_input::<SchoolOperator>("school_operator", Person),
        Variable::input("public_assistance", Household, ValueType::Int)
            .with_label("Monthly public assistance amount"),
        Variable::input("resident_tax_exempt", Household, ValueType::Bool),
        Variable::input("prefectural_income_levy", Household, ValueType::Int),
        Variable::input("municipal_income_levy", Household, ValueType::Int),
        Variable::input("dependants", Household, ValueType::Int),
        Variable::computed("is_high_school_student", Person, ValueType::Bool, is_high_school_student),
        Variable::computed(
            "household_has_correspondence_student",
            Household,
            ValueType::Bool,
            household_has_correspondence_student,
        ),
        Variable::computed(
            "public_assistance_scholarship",
            Person,
            ValueType::Int,
            public_assistance_scholarship,
        ),
        Variable::computed("tax_exempt_scholarship", Person, ValueType::Int, tax_exempt_scholarship),
        Variable::computed(
            "advanced_course_scholarship",
            Person,
            ValueType::Int,
            advanced_course_scholarship,
        ),
        Variable::computed(
            "public_assistance_scholarship_total",
            Household,
            ValueType::Int,
            public_assistance_scholarship_total,
        ),
        Variable::computed(
            "non_tuition_scholarship_total",
            Household,
            ValueType::Int,
            non_tuition_scholarship_total,
        ),
        Variable::computed("scholarship_min", Household, ValueType::Int, |ctx| {
            scholarship(ctx, Combine::Min)
        })
        .with_label("Monthly scholarship, smaller candidate"),
        Variable::computed("scholarship_max", Household, ValueType::Int, |ctx| {
            scholarship(ctx, Combine::Max)
        })
        .with_label("Monthly scholarship, larger candidate"),
    ];

    for variable in variables {
        registry.register(variable)?;
    }
    Ok(())
}

/// A registry holding only the scholarship rule set
pub fn registry() -> Result<Registry> {
    let mut registry = Registry::new();
    register(&mut registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Inputs, RuleSystem};
    use crate::enums::EnumArray;
    use crate::error::EngineError;
    use crate::parameters::DataPaths;
    use crate::period::Period;
    use crate::population::Population;

    const BASE_YEAR: i64 = 2024;

    fn period() -> Period {
        Period::day(2024, 6, 1).unwrap()
    }

    fn system() -> RuleSystem {
        RuleSystem::from_data(registry().unwrap(), &DataPaths::default()).unwrap()
    }

    struct Child {
        age: i64,
        grade: i64,
        course: CourseType,
        operator: SchoolOperator,
    }

    /// One household: a parent followed by `children` in order
    fn household(children: &[Child]) -> (Population, Inputs) {
        let mut builder = Population::builder()
            .household("h1")
            .member("h1", "parent", Role::Parent);
        for i in 0..children.len() {
            builder = builder.member("h1", format!("child{i}"), Role::Child);
        }
        let population = builder.build().unwrap();

        let mut births = vec![BASE_YEAR - 45];
        let mut grades = vec![0];
        let mut courses = vec![CourseType::None];
        let mut operators = vec![SchoolOperator::None];
        for c in children {
            births.push(BASE_YEAR - c.age);
            grades.push(c.grade);
            courses.push(c.course);
            operators.push(c.operator);
        }

        let inputs = Inputs::new()
            .with("birth_year", Period::Eternity, Array::Int(births))
            .with("grade", period(), Array::Int(grades))
            .with("course_type", period(), Array::Enum(EnumArray::encode(&courses)))
            .with("school_operator", period(), Array::Enum(EnumArray::encode(&operators)));
        (population, inputs)
    }

    fn ints(session: &mut crate::engine::Session<'_>, name: &str) -> Vec<i64> {
        session.compute(name, period()).unwrap().as_int().unwrap().to_vec()
    }

    #[test]
    fn test_tax_exempt_eldest_child_gets_first_child_row() {
        let system = system();
        let (population, inputs) = household(&[
            Child { age: 15, grade: 10, course: CourseType::FullTime, operator: SchoolOperator::Private },
            Child { age: 17, grade: 11, course: CourseType::FullTime, operator: SchoolOperator::Public },
        ]);
        let inputs = inputs.with("resident_tax_exempt", period(), Array::Bool(vec![true]));
        let mut session = system.session(&population, inputs).unwrap();

        // younger child: other-child row, private; elder: first-child row, public
        assert_eq!(ints(&mut session, "tax_exempt_scholarship"), vec![0, 152_000, 117_100]);
        assert_eq!(ints(&mut session, "non_tuition_scholarship_total"), vec![269_100]);
        assert_eq!(ints(&mut session, "scholarship_min"), vec![22_425]);
        assert_eq!(ints(&mut session, "scholarship_max"), vec![22_425]);
    }

    #[test]
    fn test_same_age_siblings_ranked_by_member_order() {
        let system = system();
        let twin = || Child { age: 16, grade: 10, course: CourseType::FullTime, operator: SchoolOperator::Public };
        let (population, inputs) = household(&[twin(), twin()]);
        let inputs = inputs.with("resident_tax_exempt", period(), Array::Bool(vec![true]));
        for _ in 0..3 {
            let mut session = system.session(&population, inputs.clone()).unwrap();
            assert_eq!(ints(&mut session, "tax_exempt_scholarship"), vec![0, 117_100, 143_700]);
        }
    }

    #[test]
    fn test_correspondence_student_removes_first_child_row() {
        let system = system();
        let (population, inputs) = household(&[
            Child { age: 17, grade: 11, course: CourseType::FullTime, operator: SchoolOperator::Public },
            Child { age: 16, grade: 10, course: CourseType::Correspondence, operator: SchoolOperator::Public },
        ]);
        let inputs = inputs.with("resident_tax_exempt", period(), Array::Bool(vec![true]));
        let mut session = system.session(&population, inputs).unwrap();

        assert_eq!(ints(&mut session, "tax_exempt_scholarship"), vec![0, 143_700, 50_500]);
        assert_eq!(ints(&mut session, "scholarship_min"), vec![194_200 / 12]);
    }

    #[test]
    fn test_public_assistance_household() {
        let system = system();
        let (population, inputs) = household(&[Child {
            age: 16,
            grade: 10,
            course: CourseType::PartTime,
            operator: SchoolOperator::Private,
        }]);
        let inputs = inputs
            .with("public_assistance", period(), Array::Int(vec![50_000]))
            .with("resident_tax_exempt", period(), Array::Bool(vec![true]));
        let mut session = system.session(&population, inputs).unwrap();

        assert_eq!(ints(&mut session, "public_assistance_scholarship_total"), vec![52_600]);
        assert_eq!(ints(&mut session, "non_tuition_scholarship_total"), vec![0]);
        assert_eq!(ints(&mut session, "scholarship_min"), vec![4_383]);
        assert_eq!(ints(&mut session, "scholarship_max"), vec![4_383]);
    }

    #[test]
    fn test_advanced_course_thresholds() {
        let system = system();
        let advanced = || Child { age: 19, grade: 12, course: CourseType::Advanced, operator: SchoolOperator::National };

        let cases = [
            // (levy each, dependants, expected monthly)
            (100_000, 1, 50_500 / 12),
            (150_000, 3, 50_500 / 12),
            (150_000, 2, 0),
            (300_000, 3, 0),
        ];
        for (levy, dependants, expected) in cases {
            let (population, inputs) = household(&[advanced()]);
            let inputs = inputs
                .with("prefectural_income_levy", period(), Array::Int(vec![levy]))
                .with("municipal_income_levy", period(), Array::Int(vec![levy]))
                .with("dependants", period(), Array::Int(vec![dependants]));
            let mut session = system.session(&population, inputs).unwrap();
            assert_eq!(ints(&mut session, "scholarship_max"), vec![expected], "levy {levy}");
        }
    }

    #[test]
    fn test_non_student_child_is_never_looked_up() {
        let system = system();
        let (population, inputs) = household(&[Child {
            age: 16,
            grade: 10,
            course: CourseType::None,
            operator: SchoolOperator::Public,
        }]);
        let inputs = inputs.with("resident_tax_exempt", period(), Array::Bool(vec![true]));
        let mut session = system.session(&population, inputs).unwrap();
        assert_eq!(ints(&mut session, "scholarship_min"), vec![0]);
    }

    #[test]
    fn test_unmatched_course_raises_bounds_error() {
        let table = AmountTable::from_rows("t", vec![vec![1, 2, 3, 4]]).unwrap();
        let tables = OperatorTables {
            national: &table,
            public: &table,
            private: &table,
        };
        let result = annual_amounts(
            &tables,
            &[SchoolOperator::Public],
            &[RecipientCategory::PublicAssistance],
            &[CourseType::None],
            &[true],
        );
        assert!(matches!(
            result,
            Err(EngineError::TableIndexOutOfRange { row: 0, col: -1, .. })
        ));
    }

    #[test]
    fn test_shared_totals_evaluated_once() {
        let system = system();
        let (population, inputs) = household(&[Child {
            age: 17,
            grade: 11,
            course: CourseType::FullTime,
            operator: SchoolOperator::Public,
        }]);
        let mut session = system.session(&population, inputs).unwrap();
        session.compute("scholarship_min", period()).unwrap();
        let after_min = session.stats().evaluations;
        session.compute("scholarship_max", period()).unwrap();
        assert_eq!(session.stats().evaluations, after_min + 1);
    }

    #[test]
    fn test_age_follows_eternal_birth_year() {
        let system = system();
        let population = Population::builder()
            .household("h1")
            .member("h1", "parent", Role::Parent)
            .member("h1", "child", Role::Child)
            .build()
            .unwrap();
        let inputs = Inputs::new().with("birth_year", Period::Eternity, Array::Int(vec![1979, 0]));
        let mut session = system.session(&population, inputs).unwrap();

        assert_eq!(ints(&mut session, "age"), vec![45, 0]);
        let later = Period::day(2030, 1, 1).unwrap();
        assert_eq!(*session.compute("age", later).unwrap(), Array::Int(vec![51, 0]));
        assert!(matches!(
            session.compute("age", Period::Eternity),
            Err(EngineError::InvalidPeriod(_))
        ));
    }
}
