//! Object file loading.
//!
//! An object file is a flat byte image, exactly what the assembler wrote.
//! The file is read fully before any byte reaches memory, so a failed read
//! never leaves a partial program behind.

use std::fs;
use std::path::Path;

use crate::errors::LoadError;
use crate::machine::Machine;

/// Reads an object file into memory (at byte address 0) and returns the
/// number of bytes loaded.
pub fn load_file(machine: &mut Machine, path: &Path) -> Result<usize, LoadError> {
    let object = fs::read(path)?;
    machine.load(&object);
    Ok(object.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::State;

    #[test]
    fn loads_a_file_into_memory() {
        let path = std::env::temp_dir().join("sicvm-loader-test.obj");
        fs::write(&path, [0x01, 0x00, 9, 0x4C]).unwrap();

        let mut machine = Machine::with_memory_words(8);
        let loaded = load_file(&mut machine, &path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, 4);
        assert_eq!(machine.state(), State::Idle);
        assert_eq!(machine.memory().get_byte(3), 0x4C);
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut machine = Machine::with_memory_words(8);
        let result = load_file(&mut machine, Path::new("/nonexistent/prog.obj"));
        assert!(matches!(result, Err(LoadError::Io(_))));
        // nothing was copied in
        assert_eq!(machine.memory().get_byte(0), 0);
    }
}
