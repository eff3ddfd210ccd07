use super::{ParseError, read_file};
use crate::db::core::DesignDB;

pub fn parse(db: &mut DesignDB, filename: &str) -> Result<(), ParseError> {
    let content = read_file(filename)?;
    parse_str(db, &content)
}

/// Reads net records of the form
///
/// ```text
/// net_name
/// (
/// pin_name slack [(layer, x, y), (layer, x, y)]
/// )
/// ```
///
/// Brackets, parentheses and commas inside a pin line are separators.
pub fn parse_str(db: &mut DesignDB, content: &str) -> Result<(), ParseError> {
    let mut lines = content.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));
    let mut num_nets = 0;

    while let Some((_, name)) = lines.by_ref().find(|(_, l)| !l.is_empty()) {
        let net = db.add_net(name.to_string());
        num_nets += 1;

        match lines.next() {
            Some((_, "(")) => {}
            Some((line, other)) => {
                return Err(ParseError::Malformed {
                    line,
                    message: format!("expected '(' after net '{}', found '{}'", name, other),
                });
            }
            None => {
                return Err(ParseError::UnexpectedEof {
                    field: format!("opening parenthesis of net '{}'", name),
                });
            }
        }

        loop {
            let Some((line, text)) = lines.next() else {
                return Err(ParseError::UnexpectedEof {
                    field: format!("closing parenthesis of net '{}'", name),
                });
            };
            if text.is_empty() {
                continue;
            }
            if text == ")" {
                break;
            }

            let cleaned: String = text
                .chars()
                .map(|c| match c {
                    '[' | ']' | '(' | ')' | ',' => ' ',
                    other => other,
                })
                .collect();
            let parts: Vec<&str> = cleaned.split_whitespace().collect();
            if parts.len() < 2 || (parts.len() - 2) % 3 != 0 {
                return Err(ParseError::Malformed {
                    line,
                    message: format!("pin line of net '{}' is not 'name slack (layer x y)*'", name),
                });
            }

            let slack: f64 = parts[1].parse().map_err(|_| ParseError::Malformed {
                line,
                message: format!("invalid slack '{}'", parts[1]),
            })?;
            let pin = db.add_pin(net, parts[0].to_string(), slack);

            for triple in parts[2..].chunks(3) {
                let (layer, x, y) = match (
                    triple[0].parse::<usize>(),
                    triple[1].parse::<i32>(),
                    triple[2].parse::<i32>(),
                ) {
                    (Ok(layer), Ok(x), Ok(y)) => (layer, x, y),
                    _ => {
                        return Err(ParseError::Malformed {
                            line,
                            message: format!(
                                "invalid access point '{} {} {}' of pin '{}'",
                                triple[0], triple[1], triple[2], parts[0]
                            ),
                        });
                    }
                };
                db.add_point(pin, layer, x, y);
            }
        }
    }

    log::info!(
        "Netlist: {} nets, {} pins, {} access points",
        num_nets,
        db.num_pins(),
        db.num_points()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bracketed_pins() {
        let text = "net0\n(\nA 0.5 [(0, 1, 2), (1, 1, 2)]\nB -1 [(2, 4, 4)]\n)\n\nnet1\n(\nC 0 [(0, 0, 0)]\n)\n";
        let mut db = DesignDB::new();
        parse_str(&mut db, text).unwrap();
        assert_eq!(db.num_nets(), 2);
        assert_eq!(db.num_pins(), 3);
        assert_eq!(db.num_points(), 4);
        let pin_a = db.nets[0].pins[0];
        assert_eq!(db.pins[pin_a.index()].name, "A");
        assert_eq!(db.pins[pin_a.index()].slack, 0.5);
        let layers: Vec<usize> = db.pin_points(pin_a).map(|p| p.layer).collect();
        assert_eq!(layers, vec![0, 1]);
        let pin_b = db.nets[0].pins[1];
        let b = db.pin_points(pin_b).next().unwrap();
        assert_eq!((b.layer, b.x, b.y), (2, 4, 4));
    }

    #[test]
    fn dangling_coordinate_is_malformed() {
        let text = "net0\n(\nA 0 [(0, 1)]\n)\n";
        let mut db = DesignDB::new();
        assert!(matches!(
            parse_str(&mut db, text),
            Err(ParseError::Malformed { line: 3, .. })
        ));
    }

    #[test]
    fn missing_close_is_reported() {
        let text = "net0\n(\nA 0 [(0, 1, 1)]\n";
        let mut db = DesignDB::new();
        let err = parse_str(&mut db, text).unwrap_err();
        assert!(err.to_string().contains("closing parenthesis of net 'net0'"));
    }
}
