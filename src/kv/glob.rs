/// Matches `text` against a Redis-style glob `pattern`.
///
/// Supports `*`, `?`, bracket classes (`[abc]`, `[a-z]`, `[^x]`) and backslash escapes.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    match_from(&p, &t)
}

fn match_from(p: &[char], t: &[char]) -> bool {
    let (mut pi, mut ti) = (0, 0);
    // Backtrack point for the last `*` seen: (pattern index after star, text index).
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        let step = if pi < p.len() { match_one(p, pi, t[ti]) } else { Step::Fail };
        match step {
            Step::Star => {
                star = Some((pi + 1, ti));
                pi += 1;
            }
            Step::Advance(next) => {
                pi = next;
                ti += 1;
            }
            Step::Fail => match star {
                Some((sp, st)) => {
                    pi = sp;
                    ti = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    p[pi..].iter().all(|c| *c == '*')
}

enum Step {
    Star,
    Advance(usize),
    Fail,
}

fn match_one(p: &[char], pi: usize, c: char) -> Step {
    match p[pi] {
        '*' => Step::Star,
        '?' => Step::Advance(pi + 1),
        '\\' if pi + 1 < p.len() => {
            if p[pi + 1] == c { Step::Advance(pi + 2) } else { Step::Fail }
        }
        '[' => match_class(p, pi, c),
        lit => {
            if lit == c { Step::Advance(pi + 1) } else { Step::Fail }
        }
    }
}

fn match_class(p: &[char], pi: usize, c: char) -> Step {
    let mut i = pi + 1;
    let negate = i < p.len() && p[i] == '^';
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < p.len() && p[i] != ']' {
        if p[i] == '\\' && i + 1 < p.len() {
            matched |= p[i + 1] == c;
            i += 2;
        } else if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' {
            let (lo, hi) = if p[i] <= p[i + 2] { (p[i], p[i + 2]) } else { (p[i + 2], p[i]) };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= p[i] == c;
            i += 1;
        }
    }

    // Unterminated class: Redis treats the end of the pattern as the closing bracket.
    let next = if i < p.len() { i + 1 } else { i };
    if matched != negate { Step::Advance(next) } else { Step::Fail }
}
