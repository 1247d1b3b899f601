use trellis_core::directive::DirectiveFlags;
use trellis_core::inflator::Inflator;

pub use self::conditional::IfDirectiveFactory;
pub use self::container::ContainerDirectiveFactory;

mod conditional;
mod container;

/// Register the toolkit's directives: `trellis.container` and `if`.
pub fn standard_directives(inflator: &mut Inflator) -> &mut Inflator {
    inflator
        .add_directive(ContainerDirectiveFactory, DirectiveFlags::empty())
        .add_directive(IfDirectiveFactory, DirectiveFlags::empty())
}
