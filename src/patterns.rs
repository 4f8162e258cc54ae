/// Built-in patterns, General MIDI percussion notes on channel 10

pub const FUNKY_DRUMMER: &str = "\
# Funky Drummer, 16 steps
36 x.x.......x..x.. bass drum
38 ....x..m.m.mx..m snare
42 xxxxx.x.xxxxx.xx closed hi-hat
46 .....x.x.....x.. open hi-hat
";

pub const FOUR_ON_THE_FLOOR: &str = "\
36 x...x...x...x... bass drum
39 ....x.......x... hand clap
42 ..x...x...x...x. closed hi-hat
";

pub const BUILTIN: &[(&str, &str)] = &[
    ("funky", FUNKY_DRUMMER),
    ("four", FOUR_ON_THE_FLOOR),
];

pub fn builtin(name: &str) -> Option<&'static str> {
    BUILTIN
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, text)| *text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::Pattern;

    #[test]
    fn test_builtins_compile() {
        for (name, text) in BUILTIN {
            let pattern = Pattern::compile(text).unwrap_or_else(|e| panic!("{}: {}", name, e));
            assert_eq!(pattern.steps(), 16);
        }
        assert_eq!(builtin("FUNKY"), Some(FUNKY_DRUMMER));
        assert_eq!(builtin("polka"), None);
    }
}
