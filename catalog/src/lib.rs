//! Built-in catalog of example snippets.
//!
//! Static data only: each entry pairs a display name with the code text sent
//! to the sandbox, a time window, and (for the guided example) a reference
//! solution. Entries are keyed by slug and listed in a fixed order.

use marble_types::VizParams;

/// One catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct CodeExample {
    key: &'static str,
    name: &'static str,
    code: &'static str,
    solution: Option<&'static str>,
    time_window: u64,
}

impl CodeExample {
    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    #[must_use]
    pub fn solution(&self) -> Option<&'static str> {
        self.solution
    }

    /// Time window in milliseconds.
    #[must_use]
    pub fn time_window(&self) -> u64 {
        self.time_window
    }

    /// Build visualization parameters for this entry.
    ///
    /// Catalog data is validated by test, so this cannot fail for shipped
    /// entries.
    pub fn params(&self) -> Result<VizParams, marble_types::VizParamsError> {
        VizParams::new(
            self.time_window,
            self.code,
            self.solution.map(String::from),
        )
    }
}

/// Look up an entry by its slug.
#[must_use]
pub fn get(key: &str) -> Option<&'static CodeExample> {
    EXAMPLES.iter().find(|example| example.key == key)
}

/// All entries, in presentation order.
#[must_use]
pub fn all() -> &'static [CodeExample] {
    EXAMPLES
}

static EXAMPLES: &[CodeExample] = &[
    CodeExample {
        key: "basic-interval",
        name: "Basic interval",
        code: r"Rx.Observable
  .interval(1000)
  .take(4)
",
        solution: Some(
            r"const timer$ = Rx.Observable.interval(1000);
const pieces$ = Rx.Observable.of('', '♞', '', '♞', '♘', '♞');
const columns$ = Rx.Observable.of('e', 'c', 'g', 'd', 'e', 'f');
const rows$ = Rx.Observable.of('4', '6', '4', '4', '2', '3');

Rx.Observable.zip(
  timer$,
  pieces$,
  columns$,
  rows$,
  (_, piece, column, row) => `${piece}${column}${row}`
)
",
        ),
        time_window: 5000,
    },
    CodeExample {
        key: "random-error",
        name: "Random error",
        code: r"Rx.Observable
  .create(observer => {
    let n = 1;

    const intervalId = setInterval(() => {
      if (Math.random() < 0.8 && n < 9) {
        observer.next(n * n);
        n += 1;
      } else {
        observer.error('Oh no...');
      }
    }, 1000);

    return () => clearInterval(intervalId);
  })
",
        solution: None,
        time_window: 10000,
    },
    CodeExample {
        key: "chess-game",
        name: "Chess game",
        code: r"const timer$ = Rx.Observable.interval(1000);
const pieces$ = Rx.Observable.of('', '♞', '', '♞', '♘', '♞');
const columns$ = Rx.Observable.of('e', 'c', 'g', 'd', 'e', 'f');
const rows$ = Rx.Observable.of('4', '6', '4', '4', '2', '3');

Rx.Observable.zip(
  timer$,
  pieces$,
  columns$,
  rows$,
  (_, piece, column, row) => `${piece}${column}${row}`
)
",
        solution: None,
        time_window: 7000,
    },
    CodeExample {
        key: "higher-order-observable",
        name: "Higher order Observable",
        code: r"Rx.Observable
  .interval(1000)
  .groupBy(n => n % 2)
",
        solution: None,
        time_window: 10000,
    },
    CodeExample {
        key: "grouped-fibonacci",
        name: "Grouped Fibonacci",
        code: r"Rx.Observable
  .interval(1000)
  .scan(({ secondLast, last }) => ({
    secondLast: last,
    last: last + secondLast,
  }), { secondLast: 0, last: 1 })
  .pluck('secondLast')
  .groupBy(n => Math.floor(Math.log10(n)))
",
        solution: None,
        time_window: 15000,
    },
    CodeExample {
        key: "today-is",
        name: "Today is...",
        code: r"const sentence = new Date().toString().toUpperCase();
const words = sentence.split(' ');
const delay = 1000;

const wordDelay = i =>
  i === 0
    ? delay
    : (words[i - 1].length + 1) * delay;

const wordStart = i =>
  i < words.length
    ? Rx.Observable
        .of(i)
        .delay(wordDelay(i))
    : Rx.Observable
        .empty()
        .delay(wordDelay(i));

const wordObservable = word => {
  const letters = word.split('');

  return Rx.Observable
    .interval(delay)
    .take(letters.length)
    .map(i => letters[i]);
};

Rx.Observable
  .range(0, words.length + 1)
  .concatMap(wordStart)
  .map(i => wordObservable(words[i]))
",
        solution: None,
        time_window: 17000,
    },
    CodeExample {
        key: "custom-operator",
        name: "Custom operator",
        code: r"const sqrt = source$ => Rx.Observable.create(observer =>
  source$.subscribe(
    value => {
      const result = Math.sqrt(value);
      if (typeof value !== 'number' || isNaN(result)) {
        observer.error(`Square root of ${value} doesn't exist`);
      } else {
        observer.next(result);
      }
    },
    err => observer.error(err),
    () => observer.complete()
  )
);

Rx.Observable
  .interval(1000)
  .pipe(sqrt)
",
        solution: None,
        time_window: 12000,
    },
    CodeExample {
        key: "mouse-move",
        name: "Mouse move",
        code: r"Rx.Observable
  .fromEvent(document, 'mousemove')
  .map(event => event.clientX)
  .throttleTime(300)

// Move your mouse over the right hand pane
// after clicking Visualize.
",
        solution: None,
        time_window: 10000,
    },
    CodeExample {
        key: "input-element",
        name: "Input element",
        code: r"const input = document.createElement('input');

input.setAttribute('placeholder', 'Type something');

/*
  `output` represents the right hand pane.
  You can prepend/append elements to it.
 */
output.prepend(input);

input.focus();

Rx.Observable
  .fromEvent(input, 'keydown')
  .map(e => e.key)
  .filter(key => key !== ' ');
",
        solution: None,
        time_window: 20000,
    },
    CodeExample {
        key: "pause-and-resume",
        name: "Pause and resume",
        code: r"const pauseResume$ = Rx.Observable
  .fromEvent(document, 'click')
  .scan(acc => !acc, true)
  .startWith(true);

const counter$ = Rx.Observable.timer(0, 1000);

const empty$ = Rx.Observable.empty();

pauseResume$
  .switchMap(resume => resume ? counter$ : empty$)

// Click to pause and resume over the right hand pane
// after clicking Visualize.
",
        solution: None,
        time_window: 20000,
    },
    CodeExample {
        key: "custom",
        name: "Custom",
        code: r"/*
  Write any JavaScript you want, just make sure that
  the last expression is an Rx.Observable
 */
 ",
        solution: None,
        time_window: 10000,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entry_is_well_formed() {
        for example in all() {
            assert!(!example.key().is_empty());
            assert!(!example.name().is_empty(), "{}: empty name", example.key());
            assert!(
                !example.code().trim().is_empty(),
                "{}: empty code",
                example.key()
            );
            assert!(
                example.time_window() > 0,
                "{}: non-positive time window",
                example.key()
            );
        }
    }

    #[test]
    fn test_every_entry_builds_params() {
        for example in all() {
            let params = example.params().unwrap();
            assert_eq!(params.time_window(), example.time_window());
            assert_eq!(params.code(), example.code());
            assert_eq!(params.solution(), example.solution());
        }
    }

    #[test]
    fn test_keys_are_unique() {
        for (i, a) in all().iter().enumerate() {
            for b in &all()[i + 1..] {
                assert_ne!(a.key(), b.key());
            }
        }
    }

    #[test]
    fn test_lookup_by_key() {
        let example = get("basic-interval").unwrap();
        assert_eq!(example.name(), "Basic interval");
        assert_eq!(example.time_window(), 5000);
        assert!(example.solution().is_some());
    }

    #[test]
    fn test_lookup_unknown_key() {
        assert!(get("does-not-exist").is_none());
    }

    #[test]
    fn test_only_guided_example_has_solution() {
        let with_solution: Vec<_> = all()
            .iter()
            .filter(|e| e.solution().is_some())
            .map(CodeExample::key)
            .collect();
        assert_eq!(with_solution, vec!["basic-interval"]);
    }

    #[test]
    fn test_presentation_order_starts_with_basics() {
        let keys: Vec<_> = all().iter().map(CodeExample::key).collect();
        assert_eq!(keys[0], "basic-interval");
        assert_eq!(*keys.last().unwrap(), "custom");
        assert_eq!(keys.len(), 11);
    }
}
