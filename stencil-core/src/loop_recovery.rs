//! Loop recovery: rewrite hand-unrolled pack templates into counted groups
//!
//! Generated templates such as `"C1" * 5000` would otherwise compile into a
//! tree with one node per directive. Before parsing, long templates are
//! scanned for runs of a repeating unit of directives, and each qualifying
//! run is replaced by `(unit)N`. The rewrite is purely textual and never
//! changes what the template does; anything that does not lex cleanly is
//! handed back untouched so the parser can report it.

use crate::directive::{lex, Count, Directive, Token};
use crate::options::CompileOptions;
use std::borrow::Cow;
use std::fmt::Write as _;

#[cfg(feature = "logging")]
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Directive(Directive),
    Group(Vec<Item>, Count),
}

/// Rewrite repeated runs in `template`, or return it unchanged
pub fn recover<'a>(template: &'a str, options: &CompileOptions) -> Cow<'a, str> {
    if !options.loop_recovery || template.len() < options.loop_recovery_min_template_len {
        return Cow::Borrowed(template);
    }

    let Some(items) = lex(template).ok().and_then(|tokens| group(&tokens)) else {
        return Cow::Borrowed(template);
    };

    let (items, changed) = compress(items, options);
    if !changed {
        return Cow::Borrowed(template);
    }

    let mut out = String::with_capacity(template.len() / 4);
    render(&items, &mut out);

    #[cfg(feature = "logging")]
    debug!(
        original_len = template.len(),
        recovered_len = out.len(),
        "loop recovery rewrote template"
    );

    Cow::Owned(out)
}

/// Nest a flat token stream into items; `None` if groups are unbalanced
fn group(tokens: &[Token]) -> Option<Vec<Item>> {
    let mut stack: Vec<Vec<Item>> = vec![Vec::new()];
    for token in tokens {
        match token {
            Token::Directive(d) => stack.last_mut()?.push(Item::Directive(d.clone())),
            Token::GroupOpen => stack.push(Vec::new()),
            Token::GroupClose(count) => {
                if stack.len() < 2 {
                    return None;
                }
                let body = stack.pop()?;
                stack.last_mut()?.push(Item::Group(body, *count));
            }
        }
    }
    if stack.len() == 1 {
        stack.pop()
    } else {
        None
    }
}

fn compress(items: Vec<Item>, options: &CompileOptions) -> (Vec<Item>, bool) {
    let mut changed = false;
    let items: Vec<Item> = items
        .into_iter()
        .map(|item| match item {
            Item::Group(body, count) => {
                let (body, inner) = compress(body, options);
                changed |= inner;
                Item::Group(body, count)
            }
            other => other,
        })
        .collect();

    let mut out = Vec::with_capacity(items.len());
    let mut i = 0;
    while i < items.len() {
        match best_run(&items[i..], options) {
            Some((unit, reps)) => {
                out.push(Item::Group(items[i..i + unit].to_vec(), Count::Fixed(reps)));
                i += unit * reps;
                changed = true;
            }
            None => {
                out.push(items[i].clone());
                i += 1;
            }
        }
    }
    (out, changed)
}

/// Longest-coverage repeating unit at the front of `items`
fn best_run(items: &[Item], options: &CompileOptions) -> Option<(usize, usize)> {
    let max_unit = options.loop_recovery_max_unit.min(items.len() / 2);
    let mut best: Option<(usize, usize)> = None;

    for unit in 1..=max_unit {
        let head = &items[..unit];
        let reps = 1 + items[unit..]
            .chunks_exact(unit)
            .take_while(|chunk| *chunk == head)
            .count();
        let coverage = unit * reps;
        if reps >= 2
            && coverage >= options.loop_recovery_min_unrolled
            && best.map_or(true, |(u, r)| coverage > u * r)
        {
            best = Some((unit, reps));
        }
    }
    best
}

fn render(items: &[Item], out: &mut String) {
    for item in items {
        match item {
            Item::Directive(d) => {
                let _ = write!(out, "{}", d);
            }
            Item::Group(body, count) => {
                out.push('(');
                render(body, out);
                let _ = write!(out, "){}", count);
            }
        }
    }
}
